//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use tunnel_core::BridgeConfig;

/// Configuration for the tunnel server.
///
/// Constructed from CLI arguments in `main.rs` and passed to
/// [`crate::infrastructure::run_server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Per-session forwarding settings; `chunk_size` also sizes the
    /// WebSocket read buffer.
    pub bridge: BridgeConfig,

    /// Upper bound on the TCP dial to a destination.
    pub connect_timeout: Duration,

    /// How long live sessions get to close after a shutdown signal.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:8080` |
    /// | bridge          | `BridgeConfig::default()` |
    /// | connect_timeout | 10 seconds     |
    /// | shutdown_grace  | 5 seconds      |
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            bridge: BridgeConfig::default(),
            connect_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}
