//! [`FrameTransport`](super::FrameTransport) adapter for tokio-tungstenite.
//!
//! Wraps a `WebSocketStream` over any async byte stream (a plain `TcpStream`,
//! a TLS stream, or an in-memory duplex in tests).

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::frame::{CloseReason, Frame, TransportError};

/// A tokio-tungstenite WebSocket seen as a stream of [`Frame`]s.
pub struct TungsteniteTransport<S> {
    inner: WebSocketStream<S>,
}

impl<S> TungsteniteTransport<S> {
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> WebSocketStream<S> {
        self.inner
    }
}

/// Converts a tungstenite message; raw frames (never produced when reading)
/// map to `None`.
pub fn frame_from_message(msg: Message) -> Option<Frame> {
    match msg {
        Message::Binary(data) => Some(Frame::Binary(data)),
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Ping(data) => Some(Frame::Ping(data)),
        Message::Pong(data) => Some(Frame::Pong(data)),
        Message::Close(close) => Some(Frame::Close(close.map(|c| CloseReason {
            code: u16::from(c.code),
            reason: c.reason.as_str().to_owned(),
        }))),
        Message::Frame(_) => None,
    }
}

pub fn message_from_frame(frame: Frame) -> Message {
    match frame {
        Frame::Binary(data) => Message::Binary(data),
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(close) => Message::Close(close.map(|c| CloseFrame {
            code: CloseCode::from(c.code),
            reason: c.reason.into(),
        })),
    }
}

impl<S> Stream for TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Item = Result<Frame, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(msg)) => {
                    if let Some(frame) = frame_from_message(msg) {
                        return Poll::Ready(Some(Ok(frame)));
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<S> Sink<Frame> for TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Error = TransportError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_ready(cx).map_err(Into::into)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        Pin::new(&mut self.inner)
            .start_send(message_from_frame(item))
            .map_err(Into::into)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_close(cx).map_err(Into::into)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
