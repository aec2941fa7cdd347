//! Library-independent WebSocket message type.
//!
//! The bridge works with [`Frame`] values only.  Each WebSocket library gets a
//! thin adapter that converts its own message type to and from `Frame` (see
//! [`super::tungstenite`] and the axum adapter in `tunnel-server`).

use bytes::Bytes;
use futures_util::{Sink, Stream};
use thiserror::Error;

/// Close status for an orderly shutdown (RFC 6455 §7.4.1).
pub const CLOSE_NORMAL: u16 = 1000;

/// Close status for "the endpoint hit an unexpected condition".
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Close status and reason text carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// One WebSocket message.
///
/// Tunnel data is always `Binary`; the other variants only matter for
/// keep-alive and the close handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Bytes),
    Text(String),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<CloseReason>),
}

/// Failure of a WebSocket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error reported by tokio-tungstenite.
    #[error("{0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    /// Error reported by another WebSocket library.
    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The connection ended without a close handshake.
    #[error("connection ended without a close frame")]
    Closed,
}

/// A bidirectional stream of [`Frame`]s.
///
/// Blanket-implemented for every type with the right `Stream` + `Sink` shape,
/// so adapters only implement those two traits.
pub trait FrameTransport:
    Stream<Item = Result<Frame, TransportError>> + Sink<Frame, Error = TransportError> + Send + Unpin
{
}

impl<T> FrameTransport for T where
    T: Stream<Item = Result<Frame, TransportError>>
        + Sink<Frame, Error = TransportError>
        + Send
        + Unpin
{
}
