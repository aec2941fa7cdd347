//! Session identity, lifecycle state, and termination reasons.
//!
//! A *session* is one end-to-end forwarding relationship: one TCP connection
//! paired with one WebSocket connection.  Everything here is plain data; the
//! [`Bridge`](crate::bridge::Bridge) owns the [`Session`] and is the only
//! thing that mutates it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::transport::frame::{CLOSE_INTERNAL_ERROR, CLOSE_NORMAL};

/// Process-wide session instance counter.
///
/// Only used to make session names unique in logs, so `Relaxed` ordering is
/// sufficient: a duplicate would degrade diagnostics, never behavior.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

// ── SessionId ─────────────────────────────────────────────────────────────────

/// Stable, human-readable identifier of a session.
///
/// Rendered as `host:port#instance`, e.g. `echo.local:7#12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    host: String,
    port: u16,
    instance: u64,
}

impl SessionId {
    /// Allocates a new identifier for a session towards `host:port`, taking
    /// the next value of the process-wide instance counter.
    pub fn allocate(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            instance: next_instance(),
        }
    }

    /// Builds an identifier with an explicit instance number.
    pub fn new(host: impl Into<String>, port: u16, instance: u64) -> Self {
        Self {
            host: host.into(),
            port,
            instance,
        }
    }

    /// Destination host this session forwards to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Destination port this session forwards to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Per-process instance number.
    pub fn instance(&self) -> u64 {
        self.instance
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.host, self.port, self.instance)
    }
}

// ── SessionState ──────────────────────────────────────────────────────────────

/// Lifecycle state of a session.
///
/// `Reconnecting` is only ever entered on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Both legs are open and bytes flow in both directions.
    Connected,
    /// The WebSocket leg dropped abnormally; the TCP leg is held open while a
    /// new WebSocket is dialed.
    Reconnecting,
    /// Both legs are closed or closing.  Absorbing.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connected => "connected",
            SessionState::Reconnecting => "reconnecting",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One forwarding session: identifier, creation time, and current state.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    created_at: SystemTime,
    state: SessionState,
}

impl Session {
    /// Creates a session in the `Connected` state.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            state: SessionState::Connected,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves the session to `next`.
    ///
    /// Returns `false` (and leaves the state untouched) when the session is
    /// already `Terminated`.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if self.state == SessionState::Terminated {
            return false;
        }
        self.state = next;
        true
    }
}

// ── TerminationReason ─────────────────────────────────────────────────────────

/// Why a session (or one WebSocket leg of a client session) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The TCP peer closed its side in an orderly way (EOF).
    TcpClosed,
    /// The WebSocket peer sent a close frame.
    WsClosed,
    /// Reading from or writing to the TCP endpoint failed.
    TcpError(String),
    /// Sending to or receiving from the WebSocket failed, or the WebSocket
    /// ended without a close handshake.
    WsError(String),
    /// No WebSocket traffic arrived within the keep-alive timeout.
    KeepaliveTimeout,
    /// The client gave up re-establishing the WebSocket leg.
    ReconnectExhausted { attempts: u32 },
    /// The process is shutting down.
    Shutdown,
}

impl TerminationReason {
    /// `true` for intentional, orderly endings.
    pub fn is_normal(&self) -> bool {
        matches!(
            self,
            TerminationReason::TcpClosed | TerminationReason::WsClosed | TerminationReason::Shutdown
        )
    }

    /// `true` when the WebSocket leg was lost abnormally, i.e. the case a
    /// reconnect may recover from.
    pub fn is_ws_disconnect(&self) -> bool {
        matches!(
            self,
            TerminationReason::WsError(_) | TerminationReason::KeepaliveTimeout
        )
    }

    /// WebSocket close status matching this reason: 1000 for normal endings,
    /// 1011 otherwise.
    pub fn close_code(&self) -> u16 {
        if self.is_normal() {
            CLOSE_NORMAL
        } else {
            CLOSE_INTERNAL_ERROR
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TcpClosed => f.write_str("TCP peer closed the connection"),
            TerminationReason::WsClosed => f.write_str("WebSocket peer closed the connection"),
            TerminationReason::TcpError(e) => write!(f, "TCP error: {e}"),
            TerminationReason::WsError(e) => write!(f, "WebSocket error: {e}"),
            TerminationReason::KeepaliveTimeout => f.write_str("WebSocket keep-alive timed out"),
            TerminationReason::ReconnectExhausted { attempts } => {
                write!(f, "gave up reconnecting after {attempts} attempt(s)")
            }
            TerminationReason::Shutdown => f.write_str("shutting down"),
        }
    }
}

// ── ForwardStats ──────────────────────────────────────────────────────────────

/// Bytes forwarded in each direction over the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    /// Bytes read from TCP and delivered as WebSocket binary messages.
    pub tcp_to_ws: u64,
    /// Bytes received in WebSocket binary messages and written to TCP.
    pub ws_to_tcp: u64,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display_format() {
        let id = SessionId::new("echo.local", 7, 3);
        assert_eq!(id.to_string(), "echo.local:7#3");
    }

    #[test]
    fn test_allocate_increments_instance_counter() {
        // Arrange / Act
        let a = SessionId::allocate("h", 1);
        let b = SessionId::allocate("h", 1);

        // Assert: other tests may allocate concurrently, so only ordering is checked
        assert!(b.instance() > a.instance());
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_session_starts_connected() {
        let session = Session::new(SessionId::new("h", 1, 1));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_terminated_is_absorbing() {
        // Arrange
        let mut session = Session::new(SessionId::new("h", 1, 1));
        assert!(session.transition(SessionState::Terminated));

        // Act
        let moved = session.transition(SessionState::Connected);

        // Assert
        assert!(!moved);
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_reconnecting_round_trip() {
        let mut session = Session::new(SessionId::new("h", 1, 1));
        assert!(session.transition(SessionState::Reconnecting));
        assert!(session.transition(SessionState::Connected));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_normal_reasons_close_with_1000() {
        assert_eq!(TerminationReason::TcpClosed.close_code(), 1000);
        assert_eq!(TerminationReason::WsClosed.close_code(), 1000);
        assert_eq!(TerminationReason::Shutdown.close_code(), 1000);
    }

    #[test]
    fn test_abnormal_reasons_close_with_1011() {
        assert_eq!(TerminationReason::TcpError("x".into()).close_code(), 1011);
        assert_eq!(TerminationReason::WsError("x".into()).close_code(), 1011);
        assert_eq!(TerminationReason::KeepaliveTimeout.close_code(), 1011);
        assert_eq!(
            TerminationReason::ReconnectExhausted { attempts: 3 }.close_code(),
            1011
        );
    }

    #[test]
    fn test_only_ws_failures_are_reconnectable() {
        assert!(TerminationReason::WsError("reset".into()).is_ws_disconnect());
        assert!(TerminationReason::KeepaliveTimeout.is_ws_disconnect());
        assert!(!TerminationReason::WsClosed.is_ws_disconnect());
        assert!(!TerminationReason::TcpClosed.is_ws_disconnect());
        assert!(!TerminationReason::TcpError("x".into()).is_ws_disconnect());
    }
}
