//! Client configuration.
//!
//! [`ClientConfig`] is built from CLI arguments in `main.rs`; every field has a
//! sensible default except the target, which the user must always supply.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tunnel_core::BridgeConfig;

use super::target::TargetDescriptor;

/// How the client recovers a session whose WebSocket leg dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// When `false`, an abnormal WebSocket disconnect ends the session.
    pub enabled: bool,

    /// Pause before each redial.
    pub delay: Duration,

    /// Redials allowed per outage.
    pub max_attempts: u32,

    /// Optional bound on the total time spent reconnecting per outage.
    pub max_elapsed: Option<Duration>,

    /// TCP bytes buffered while reconnecting; reading pauses when full.
    pub buffer_limit: usize,
}

impl Default for ReconnectConfig {
    /// | Field        | Default    |
    /// |--------------|------------|
    /// | enabled      | `true`     |
    /// | delay        | 10 seconds |
    /// | max_attempts | 3          |
    /// | max_elapsed  | none       |
    /// | buffer_limit | 64 KiB     |
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_secs(10),
            max_attempts: 3,
            max_elapsed: None,
            buffer_limit: 64 * 1024,
        }
    }
}

/// Everything the client listener needs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interface the local listener binds to.
    pub bind_addr: IpAddr,

    /// Local TCP port to accept connections on.
    pub local_port: u16,

    /// Server URL and destination.
    pub target: TargetDescriptor,

    /// Per-session forwarding settings.
    pub bridge: BridgeConfig,

    pub reconnect: ReconnectConfig,

    /// Upper bound on one WebSocket dial (TCP connect plus handshake).
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Defaults for everything but the port and target: all interfaces,
    /// default bridge and reconnect settings, 10 second dial timeout.
    pub fn new(local_port: u16, target: TargetDescriptor) -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_port,
            target,
            bridge: BridgeConfig::default(),
            reconnect: ReconnectConfig::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.local_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetDescriptor {
        TargetDescriptor::new("ws://localhost:8080", "echo.local", 7).unwrap()
    }

    #[test]
    fn test_reconnect_defaults() {
        let cfg = ReconnectConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.delay, Duration::from_secs(10));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.max_elapsed, None);
        assert_eq!(cfg.buffer_limit, 65_536);
    }

    #[test]
    fn test_client_config_listens_on_all_interfaces() {
        // Arrange / Act
        let cfg = ClientConfig::new(9000, target());

        // Assert
        assert_eq!(cfg.listen_addr().to_string(), "0.0.0.0:9000");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
    }
}
