//! Entry point for the TCP-over-WebSocket tunnel server.
//!
//! Accepts WebSocket upgrades at `/<remoteHost>/<remotePort>` and connects
//! each one to the named TCP destination.
//!
//! # Usage
//!
//! ```text
//! tunnel-server [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>                 Interface to listen on [default: 0.0.0.0]
//!   --port <PORT>                 HTTP/WebSocket port [default: 8080]
//!   --connect-timeout <SECS>      Destination dial timeout [default: 10]
//!   --keepalive-interval <SECS>   WebSocket ping interval, 0 = off [default: 120]
//!   --keepalive-timeout <SECS>    Silence before a session is dropped [default: 300]
//!   --shutdown-grace <SECS>       Time sessions get to close on Ctrl+C [default: 5]
//! ```
//!
//! Every option can also be set through the matching `TUNNEL_*` environment
//! variable (`TUNNEL_BIND`, `TUNNEL_PORT`, ...).  CLI args take precedence.
//! Logging is controlled by `RUST_LOG` (default `info`).

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tunnel_core::{BridgeConfig, SessionObserver, SessionSupervisor, TracingObserver};
use tunnel_server::domain::ServerConfig;
use tunnel_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TCP-over-WebSocket tunnel server.
#[derive(Debug, Parser)]
#[command(
    name = "tunnel-server",
    about = "Connect WebSocket tunnel sessions to TCP destinations",
    version
)]
struct Cli {
    /// IP address to bind the HTTP/WebSocket listener to.
    #[arg(long, default_value = "0.0.0.0", env = "TUNNEL_BIND")]
    bind: String,

    /// TCP port for the HTTP/WebSocket listener.
    #[arg(long, default_value_t = 8080, env = "TUNNEL_PORT")]
    port: u16,

    /// Destination dial timeout in seconds.
    #[arg(long, default_value_t = 10, env = "TUNNEL_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// WebSocket ping interval in seconds; 0 disables keep-alive.
    #[arg(long, default_value_t = 120, env = "TUNNEL_KEEPALIVE_INTERVAL")]
    keepalive_interval: u64,

    /// Seconds without any WebSocket traffic before a session is dropped.
    #[arg(long, default_value_t = 300, env = "TUNNEL_KEEPALIVE_TIMEOUT")]
    keepalive_timeout: u64,

    /// Seconds live sessions get to close after Ctrl+C.
    #[arg(long, default_value_t = 5, env = "TUNNEL_SHUTDOWN_GRACE")]
    shutdown_grace: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            bridge: BridgeConfig {
                keepalive_interval: Duration::from_secs(self.keepalive_interval),
                keepalive_timeout: Duration::from_secs(self.keepalive_timeout),
                ..BridgeConfig::default()
            },
            connect_timeout: Duration::from_secs(self.connect_timeout),
            shutdown_grace: Duration::from_secs(self.shutdown_grace),
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

    let config = Cli::parse().into_server_config()?;
    info!("tunnel server starting on {}", config.bind_addr);

    let supervisor = SessionSupervisor::new();
    let shutdown = supervisor.shutdown_token();

    // Ctrl+C cancels the shared token: axum stops accepting, and every live
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

    let observer: Arc<dyn SessionObserver> = Arc::new(TracingObserver);
    run_server(config, observer, supervisor).await?;

    info!("tunnel server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
