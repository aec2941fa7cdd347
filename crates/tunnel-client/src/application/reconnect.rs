//! Use case: keep a client session alive across WebSocket outages.
//!
//! # State machine
//!
//! ```text
//!              abnormal WS loss                 budget exhausted / TCP closed
//!  Connected ───────────────────► Reconnecting ─────────────────────────────► Terminated
//!      ▲                               │
//!      └──────── redial succeeded ─────┘
//!
//!  Connected / Reconnecting ── WS close frame, TCP EOF, shutdown ──► Terminated
//! ```
//!
//! While reconnecting the TCP endpoint stays open and its bytes are buffered
//! (bounded) inside the [`Bridge`]; they are flushed to the new WebSocket
//! before anything else.  Buffered bytes are discarded on termination.

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use tunnel_core::{Bridge, Hold, SessionEvent, SessionState, TerminationReason};

use crate::domain::ReconnectConfig;
use crate::infrastructure::connector::WsConnector;

/// Retry budget for one outage.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    /// A policy under which every abnormal disconnect is terminal.
    pub fn disabled() -> Self {
        Self::new(ReconnectConfig {
            enabled: false,
            ..ReconnectConfig::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.max_attempts > 0
    }

    pub fn delay(&self) -> Duration {
        self.config.delay
    }

    pub fn buffer_limit(&self) -> usize {
        self.config.buffer_limit
    }

    /// Starts tracking a new outage of the leg connected to `url`.
    pub fn begin(&self, url: &str) -> ReconnectState {
        ReconnectState {
            url: url.to_string(),
            attempts: 0,
            started: Instant::now(),
            last_attempt: None,
        }
    }

    /// `true` while `state` still has attempts (and time) left.
    pub fn may_retry(&self, state: &ReconnectState) -> bool {
        if !self.is_enabled() || state.attempts >= self.config.max_attempts {
            return false;
        }
        self.config
            .max_elapsed
            .map_or(true, |limit| state.started.elapsed() < limit)
    }
}

/// Progress of one outage.  Dropped as soon as the leg is back or the session
/// ends.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    url: String,
    attempts: u32,
    started: Instant,
    last_attempt: Option<Instant>,
}

impl ReconnectState {
    /// The last URL that worked; every redial goes to it.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Consecutive redials so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Records the start of a redial and returns its 1-based number.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.last_attempt = Some(Instant::now());
        self.attempts
    }
}

/// Runs a client session to completion.
///
/// Forwards over `ws` until the leg ends.  Abnormal WebSocket losses are
/// recovered according to `policy`; everything else (and an exhausted budget)
/// terminates the session.
pub async fn drive_session<T, C>(
    mut bridge: Bridge<T>,
    ws: C::Transport,
    connector: &C,
    url: &str,
    policy: &ReconnectPolicy,
) -> TerminationReason
where
    T: AsyncRead + AsyncWrite + Send,
    C: WsConnector + ?Sized,
{
    let mut ws = ws;
    loop {
        let reason = bridge.forward(ws).await;
        if !(reason.is_ws_disconnect() && policy.is_enabled()) {
            return bridge.finish(reason).await;
        }

        debug!("session {}: WebSocket lost ({reason})", bridge.id());
        match reconnect(&mut bridge, connector, url, policy).await {
            Ok(next) => ws = next,
            Err(reason) => return bridge.finish(reason).await,
        }
    }
}

/// Redials `url` until it works or the budget runs out, keeping TCP open.
async fn reconnect<T, C>(
    bridge: &mut Bridge<T>,
    connector: &C,
    url: &str,
    policy: &ReconnectPolicy,
) -> Result<C::Transport, TerminationReason>
where
    T: AsyncRead + AsyncWrite + Send,
    C: WsConnector + ?Sized,
{
    bridge.set_state(SessionState::Reconnecting);
    let mut state = policy.begin(url);
    let limit = policy.buffer_limit();

    while policy.may_retry(&state) {
        let attempt = state.record_attempt();
        bridge.observer().on_session_event(&SessionEvent::Reconnecting {
            id: bridge.id().clone(),
            attempt,
        });

        if let Hold::Ended(reason) = bridge.hold(tokio::time::sleep(policy.delay()), limit).await {
            return Err(reason);
        }

        match bridge.hold(connector.connect(state.url()), limit).await {
            Hold::Ended(reason) => return Err(reason),
            Hold::Ready(Ok(ws)) => {
                bridge.set_state(SessionState::Connected);
                bridge.observer().on_session_event(&SessionEvent::Reconnected {
                    id: bridge.id().clone(),
                    attempts: attempt,
                });
                return Ok(ws);
            }
            Hold::Ready(Err(e)) => {
                warn!("session {}: reconnect attempt {attempt} failed: {e}", bridge.id());
            }
        }
    }

    Err(TerminationReason::ReconnectExhausted {
        attempts: state.attempts(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
