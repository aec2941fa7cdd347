//! Entry point for the TCP-over-WebSocket tunnel client.
//!
//! Listens on a local TCP port and forwards every accepted connection over a
//! WebSocket to a tunnel server, which connects on to the remote service.
//!
//! # Usage
//!
//! ```text
//! tunnel-client [OPTIONS] <LOCAL_PORT> <SERVER_URL> <REMOTE_HOST> <REMOTE_PORT>
//!
//! Example:
//!   tunnel-client 9000 ws://localhost:8080 echo.local 7
//!   # local connections to :9000 reach echo.local:7 via ws://localhost:8080/echo.local/7
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                     | Default   | Description                         |
//! |------------------------------|-----------|-------------------------------------|
//! | `TUNNEL_BIND`                | `0.0.0.0` | Local interface to listen on        |
//! | `TUNNEL_CONNECT_TIMEOUT`     | `10`      | WebSocket dial timeout (secs)       |
//! | `TUNNEL_KEEPALIVE_INTERVAL`  | `120`     | Ping interval (secs, 0 = off)       |
//! | `TUNNEL_KEEPALIVE_TIMEOUT`   | `300`     | Silence before the leg is dead      |
//! | `TUNNEL_NO_RECONNECT`        | unset     | Disable WebSocket reconnects        |
//! | `TUNNEL_RECONNECT_DELAY`     | `10`      | Pause before each redial (secs)     |
//! | `TUNNEL_RECONNECT_ATTEMPTS`  | `3`       | Redials per outage                  |
//! | `TUNNEL_RECONNECT_MAX_ELAPSED` | unset   | Bound on one outage (secs)          |
//! | `TUNNEL_RECONNECT_BUFFER`    | `65536`   | Bytes buffered while reconnecting   |
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tunnel_client::domain::{ClientConfig, ReconnectConfig, TargetDescriptor};
use tunnel_client::infrastructure::{run_listener, TungsteniteConnector};
use tunnel_core::{BridgeConfig, SessionObserver, SessionSupervisor, TracingObserver};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TCP-over-WebSocket tunnel client.
///
/// Accepts local TCP connections and forwards them through a tunnel server to
/// REMOTE_HOST:REMOTE_PORT.
#[derive(Debug, Parser)]
#[command(
    name = "tunnel-client",
    about = "Forward local TCP connections over WebSocket",
    version
)]
struct Cli {
    /// Local TCP port to listen on.
    local_port: u16,

    /// Tunnel server base URL (ws://, wss://, or a bare host:port).
    server_url: String,

    /// Destination host, as seen from the tunnel server.
    remote_host: String,

    /// Destination port, as seen from the tunnel server.
    remote_port: u16,

    /// Local interface to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "TUNNEL_BIND")]
    bind: String,

    /// WebSocket dial timeout in seconds.
    #[arg(long, default_value_t = 10, env = "TUNNEL_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// WebSocket ping interval in seconds; 0 disables keep-alive.
    #[arg(long, default_value_t = 120, env = "TUNNEL_KEEPALIVE_INTERVAL")]
    keepalive_interval: u64,

    /// Seconds without any WebSocket traffic before the leg counts as lost.
    #[arg(long, default_value_t = 300, env = "TUNNEL_KEEPALIVE_TIMEOUT")]
    keepalive_timeout: u64,

    /// End the session instead of redialing when the WebSocket drops.
    #[arg(long, env = "TUNNEL_NO_RECONNECT")]
    no_reconnect: bool,

    /// Seconds to wait before each redial.
    #[arg(long, default_value_t = 10, env = "TUNNEL_RECONNECT_DELAY")]
    reconnect_delay: u64,

    /// Redials allowed per outage.
    #[arg(long, default_value_t = 3, env = "TUNNEL_RECONNECT_ATTEMPTS")]
    reconnect_attempts: u32,

    /// Upper bound in seconds on the time spent reconnecting per outage.
    #[arg(long, env = "TUNNEL_RECONNECT_MAX_ELAPSED")]
    reconnect_max_elapsed: Option<u64>,

    /// Local bytes buffered while reconnecting.
    #[arg(long, default_value_t = 64 * 1024, env = "TUNNEL_RECONNECT_BUFFER")]
    reconnect_buffer: usize,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or the target
    /// arguments are rejected by [`TargetDescriptor::new`].
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let bind_addr: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        let target = TargetDescriptor::new(self.server_url, self.remote_host, self.remote_port)
            .context("invalid tunnel target")?;

        Ok(ClientConfig {
            bind_addr,
            local_port: self.local_port,
            target,
            bridge: BridgeConfig {
                keepalive_interval: Duration::from_secs(self.keepalive_interval),
                keepalive_timeout: Duration::from_secs(self.keepalive_timeout),
                ..BridgeConfig::default()
            },
            reconnect: ReconnectConfig {
                enabled: !self.no_reconnect,
                delay: Duration::from_secs(self.reconnect_delay),
                max_attempts: self.reconnect_attempts,
                max_elapsed: self.reconnect_max_elapsed.map(Duration::from_secs),
                buffer_limit: self.reconnect_buffer,
            },
            connect_timeout: Duration::from_secs(self.connect_timeout),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_client_config()?;

    info!(
        "tunnel client starting: local port {}, server {}",
        config.local_port,
        config.target.server_url()
    );
    if config.target.is_secure() && cfg!(not(feature = "tls")) {
        warn!("wss:// URL given but this build has no TLS support (enable the `tls` feature)");
    }

    let supervisor = SessionSupervisor::new();
    let shutdown = supervisor.shutdown_token();

    // Ctrl+C cancels the shared token: the accept loop stops and every live
    // session closes its WebSocket with a normal closure.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                shutdown.cancel();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let connector = Arc::new(TungsteniteConnector::new(config.connect_timeout));
    let observer: Arc<dyn SessionObserver> = Arc::new(TracingObserver);
    let close_timeout = config.bridge.close_timeout;

    run_listener(config, connector, observer, supervisor.clone()).await?;

    // Each session needs at most one close grace period once cancelled.
    supervisor.shutdown(close_timeout * 2).await;
    info!("tunnel client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
