//! Local TCP accept loop.
//!
//! Every accepted connection gets its own supervised task that dials the
//! WebSocket and, on success, runs the session.  The accept loop itself never
//! waits on a session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tunnel_core::{
    Bridge, BridgeConfig, SessionId, SessionObserver, SessionSupervisor, TunnelError,
};

use crate::application::reconnect::{drive_session, ReconnectPolicy};
use crate::domain::{ClientConfig, TargetDescriptor};
use crate::infrastructure::connector::WsConnector;

/// Pause after a failed `accept`.  Errors such as EMFILE persist until some
/// connection closes, so retrying at once would spin.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Shared, read-only state for every session spawned by one listener.
struct ListenerContext<C: ?Sized> {
    target: TargetDescriptor,
    url: String,
    bridge: BridgeConfig,
    policy: ReconnectPolicy,
    connector: Arc<C>,
    observer: Arc<dyn SessionObserver>,
    supervisor: SessionSupervisor,
}

/// Binds `config.listen_addr()` and serves until the supervisor shuts down.
///
/// # Errors
///
/// Returns an error only if the listener cannot bind; per-connection failures
/// are logged and never end the loop.
pub async fn run_listener<C>(
    config: ClientConfig,
    connector: Arc<C>,
    observer: Arc<dyn SessionObserver>,
    supervisor: SessionSupervisor,
) -> anyhow::Result<()>
where
    C: WsConnector + 'static,
{
    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TunnelError::Bind { addr, source })
        .with_context(|| format!("failed to start listener on port {}", config.local_port))?;

    info!("listening on port {}", config.local_port);
    serve(listener, config, connector, observer, supervisor).await;
    Ok(())
}

/// Runs the accept loop on an already-bound listener.
pub async fn serve<C>(
    listener: TcpListener,
    config: ClientConfig,
    connector: Arc<C>,
    observer: Arc<dyn SessionObserver>,
    supervisor: SessionSupervisor,
) where
    C: WsConnector + 'static,
{
    let url = config.target.ws_url();
    info!(
        "forwarding to {}:{} via {url}",
        config.target.remote_host(),
        config.target.remote_port()
    );

    let ctx = Arc::new(ListenerContext {
        target: config.target,
        url,
        bridge: config.bridge,
        policy: ReconnectPolicy::new(config.reconnect),
        connector,
        observer,
        supervisor: supervisor.clone(),
    });
    let shutdown = supervisor.shutdown_token();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown signal received; stopping accept loop");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((tcp, peer)) => {
                    info!("accepted connection from {peer}");
                    let ctx = Arc::clone(&ctx);
                    supervisor.spawn(handle_connection(tcp, peer, ctx));
                }
                Err(e) => pause_after_accept_error(&e, &shutdown).await,
            },
        }
    }
}

/// Logs an accept failure and waits [`ACCEPT_ERROR_BACKOFF`] (or until
/// shutdown) before the loop accepts again.
async fn pause_after_accept_error(e: &std::io::Error, shutdown: &CancellationToken) {
    error!("accept error: {e}; retrying in {ACCEPT_ERROR_BACKOFF:?}");
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
        _ = shutdown.cancelled() => {}
    }
}

/// Dials the WebSocket for one accepted connection and runs the session.
async fn handle_connection<C>(tcp: TcpStream, peer: SocketAddr, ctx: Arc<ListenerContext<C>>)
where
    C: WsConnector + 'static,
{
    let cancel = ctx.supervisor.child_token();

    let dialed = tokio::select! {
        dialed = ctx.connector.connect(&ctx.url) => dialed,
        _ = cancel.cancelled() => {
            debug!("connection from {peer}: shutdown during dial");
            return;
        }
    };
    let ws = match dialed {
        Ok(ws) => ws,
        Err(e) => {
            // Dropping `tcp` closes the local connection.
            warn!("connection from {peer}: {e}; closing");
            return;
        }
    };

    let id = SessionId::allocate(ctx.target.remote_host(), ctx.target.remote_port());
    debug!("session {id}: local peer {peer}");
    let bridge = Bridge::new(id, tcp, ctx.bridge.clone(), Arc::clone(&ctx.observer))
        .with_cancellation(cancel);

    drive_session(bridge, ws, ctx.connector.as_ref(), &ctx.url, &ctx.policy).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
