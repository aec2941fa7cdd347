//! Bridge tuning parameters.
//!
//! [`BridgeConfig`] is shared by the client and the server.  The binaries fill
//! it from CLI arguments; tests usually start from [`BridgeConfig::default`]
//! and shorten the timers.

use std::time::Duration;

/// Per-session forwarding settings.
///
/// Cheap to clone; every session gets its own copy.
///
/// # Example
///
/// ```rust
/// use tunnel_core::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.chunk_size, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum number of bytes read from TCP per WebSocket message.
    pub chunk_size: usize,

    /// How often a WebSocket ping is sent, independent of data traffic.
    ///
    /// `Duration::ZERO` disables keep-alive entirely.
    pub keepalive_interval: Duration,

    /// How long the WebSocket may stay silent (no frame of any kind received)
    /// before the leg is treated as dead.  Only checked when keep-alive is
    /// enabled.
    pub keepalive_timeout: Duration,

    /// How long to wait for the peer to answer our close frame before the
    /// WebSocket is dropped.
    pub close_timeout: Duration,
}

impl BridgeConfig {
    /// `true` when periodic pings are enabled.
    pub fn keepalive_enabled(&self) -> bool {
        !self.keepalive_interval.is_zero()
    }
}

impl Default for BridgeConfig {
    /// | Field              | Default     |
    /// |--------------------|-------------|
    /// | chunk_size         | 4096 bytes  |
    /// | keepalive_interval | 120 seconds |
    /// | keepalive_timeout  | 300 seconds |
    /// | close_timeout      | 1 second    |
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            keepalive_interval: Duration::from_secs(120),
            keepalive_timeout: Duration::from_secs(300),
            close_timeout: Duration::from_secs(1),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
