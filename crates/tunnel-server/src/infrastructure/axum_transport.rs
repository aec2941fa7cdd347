//! [`FrameTransport`](tunnel_core::FrameTransport) adapter for axum WebSockets.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{Sink, Stream};

use tunnel_core::{CloseReason, Frame, TransportError};

/// An upgraded axum WebSocket seen as a stream of [`Frame`]s.
pub struct AxumTransport {
    inner: WebSocket,
}

impl AxumTransport {
    pub fn new(inner: WebSocket) -> Self {
        Self { inner }
    }
}

fn frame_from_message(msg: Message) -> Frame {
    match msg {
        Message::Binary(data) => Frame::Binary(data),
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Ping(data) => Frame::Ping(data),
        Message::Pong(data) => Frame::Pong(data),
        Message::Close(close) => Frame::Close(close.map(|c| CloseReason {
            code: c.code,
            reason: c.reason.as_str().to_owned(),
        })),
    }
}

fn message_from_frame(frame: Frame) -> Message {
    match frame {
        Frame::Binary(data) => Message::Binary(data),
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(close) => Message::Close(close.map(|c| CloseFrame {
            code: c.code,
            reason: c.reason.into(),
        })),
    }
}

fn transport_error(e: axum::Error) -> TransportError {
    TransportError::Other(Box::new(e))
}

impl Stream for AxumTransport {
    type Item = Result<Frame, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));
        Poll::Ready(item.map(|res| res.map(frame_from_message).map_err(transport_error)))
    }
}

impl Sink<Frame> for AxumTransport {
    type Error = TransportError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_ready(cx).map_err(transport_error)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        Pin::new(&mut self.inner)
            .start_send(message_from_frame(item))
            .map_err(transport_error)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_flush(cx).map_err(transport_error)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_close(cx).map_err(transport_error)
    }
}
