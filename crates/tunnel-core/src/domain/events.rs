//! Session lifecycle events and the observer that consumes them.
//!
//! The bridge never logs lifecycle milestones directly.  It reports them to an
//! injected [`SessionObserver`]; the binaries install [`TracingObserver`],
//! tests install [`RecordingObserver`].

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use super::session::{ForwardStats, SessionId, TerminationReason};

/// A named lifecycle milestone of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Both endpoints are open and the pumps are about to start.
    Created {
        id: SessionId,
        created_at: SystemTime,
    },
    /// The WebSocket leg dropped; reconnect attempt number `attempt` is about
    /// to be made (client side only).
    Reconnecting { id: SessionId, attempt: u32 },
    /// A new WebSocket leg is up after `attempts` tries (client side only).
    Reconnected { id: SessionId, attempts: u32 },
    /// Both endpoints are closed and the pumps have exited.
    Terminated {
        id: SessionId,
        reason: TerminationReason,
        stats: ForwardStats,
        duration: Duration,
    },
}

impl SessionEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::Created { id, .. }
            | SessionEvent::Reconnecting { id, .. }
            | SessionEvent::Reconnected { id, .. }
            | SessionEvent::Terminated { id, .. } => id,
        }
    }
}

/// Receives lifecycle events from every session in the process.
///
/// Called inline from session tasks, so implementations must be cheap and
/// must not block.
pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

// ── TracingObserver ───────────────────────────────────────────────────────────

/// Forwards lifecycle events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Created { id, .. } => info!("session {id}: created"),
            SessionEvent::Reconnecting { id, attempt } => {
                warn!("session {id}: WebSocket lost; reconnect attempt {attempt}")
            }
            SessionEvent::Reconnected { id, attempts } => {
                info!("session {id}: WebSocket re-established after {attempts} attempt(s)")
            }
            SessionEvent::Terminated {
                id,
                reason,
                stats,
                duration,
            } if reason.is_normal() => info!(
                "session {id}: terminated ({reason}) after {:.1}s, {} bytes up, {} bytes down",
                duration.as_secs_f64(),
                stats.tcp_to_ws,
                stats.ws_to_tcp
            ),
            SessionEvent::Terminated {
                id,
                reason,
                stats,
                duration,
            } => warn!(
                "session {id}: terminated ({reason}) after {:.1}s, {} bytes up, {} bytes down",
                duration.as_secs_f64(),
                stats.tcp_to_ws,
                stats.ws_to_tcp
            ),
        }
    }
}

// ── RecordingObserver ─────────────────────────────────────────────────────────

/// An observer that keeps every event in memory, in arrival order.
///
/// Meant for tests: share it through an `Arc`, run sessions, then inspect
/// [`RecordingObserver::events`].
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// All `Terminated` events recorded so far, as `(id, reason)` pairs.
    pub fn terminations(&self) -> Vec<(SessionId, TerminationReason)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Terminated { id, reason, .. } => Some((id, reason)),
                _ => None,
            })
            .collect()
    }

    /// Number of `Created` events recorded so far.
    pub fn created_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SessionEvent::Created { .. }))
            .count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_session_event(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
