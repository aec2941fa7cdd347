//! # tunnel-core
//!
//! Shared library for the TCP-over-WebSocket tunnel.  It contains the session
//! bridge, the WebSocket frame abstraction, session lifecycle events, and the
//! task supervisor used for graceful shutdown.
//!
//! This crate is used by both the client (`tunnel-client`) and the server
//! (`tunnel-server`).  It opens no sockets of its own: callers hand it an
//! already-connected TCP stream and an already-upgraded WebSocket.
//!
//! # Architecture overview
//!
//! ```text
//!  local app ──TCP──► tunnel-client ══WebSocket══► tunnel-server ──TCP──► destination
//!                      └── Bridge ──┘              └── Bridge ──┘
//! ```
//!
//! Each side runs one [`Bridge`] per session.  A bridge moves raw bytes from
//! TCP into binary WebSocket messages and back, without interpreting them.
//!
//! - **`domain`** – Session identity, state machine, termination reasons,
//!   lifecycle events, and the [`BridgeConfig`] knobs.  No I/O.
//!
//! - **`transport`** – The [`Frame`] type and the [`FrameTransport`] trait the
//!   bridge is generic over, plus the tokio-tungstenite adapter.
//!
//! - **`bridge`** – The bidirectional pump, keep-alive, close handshake, and
//!   the hooks the client uses to survive a WebSocket reconnect.
//!
//! - **`supervisor`** – Tracks session tasks and drains them on shutdown.

pub mod bridge;
pub mod domain;
pub mod supervisor;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `tunnel_core::Bridge` instead of `tunnel_core::bridge::Bridge`.
pub use bridge::{Bridge, Hold};
pub use domain::{
    BridgeConfig, ForwardStats, RecordingObserver, Session, SessionEvent, SessionId,
    SessionObserver, SessionState, TerminationReason, TracingObserver, TunnelError,
};
pub use supervisor::SessionSupervisor;
pub use transport::{
    CloseReason, Frame, FrameTransport, TransportError, TungsteniteTransport,
    CLOSE_INTERNAL_ERROR, CLOSE_NORMAL,
};
