//! HTTP front end: health check, tunnel upgrade handler, and the serve loop.
//!
//! # Routing
//!
//! ```text
//! GET /health               → 200 "OK"
//! /<remoteHost>/<remotePort> + WebSocket upgrade → tunnel session
//! anything else             → 400 with a plain-text reason
//! ```
//!
//! The tunnel handler is the router's fallback, so every path except
//! `/health` goes through [`parse_tunnel_path`] first.  A malformed path is
//! rejected before the upgrade is even looked at.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use tunnel_core::{SessionObserver, SessionSupervisor, TunnelError};

use crate::application::{dispatch, DispatchContext};
use crate::domain::{parse_tunnel_path, ServerConfig};
use crate::infrastructure::axum_transport::AxumTransport;

/// Body of the health check response.
pub const HEALTH_BODY: &str = "OK";

/// Body of the 400 response to a plain HTTP request on a tunnel path.
pub const NOT_WEBSOCKET_BODY: &str = "Only WebSocket requests are supported";

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub observer: Arc<dyn SessionObserver>,
    pub supervisor: SessionSupervisor,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        observer: Arc<dyn SessionObserver>,
        supervisor: SessionSupervisor,
    ) -> Self {
        Self {
            config: Arc::new(config),
            observer,
            supervisor,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(tunnel_handler)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    HEALTH_BODY
}

async fn tunnel_handler(
    State(state): State<AppState>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let target = match parse_tunnel_path(uri.path()) {
        Ok(target) => target,
        Err(e) => {
            debug!("rejected {}: {e}", uri.path());
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            debug!("rejected {}: not a WebSocket upgrade ({rejection})", uri.path());
            return (StatusCode::BAD_REQUEST, NOT_WEBSOCKET_BODY).into_response();
        }
    };

    info!("tunnel request for {target}");
    let ctx = DispatchContext {
        bridge: state.config.bridge.clone(),
        connect_timeout: state.config.connect_timeout,
        observer: Arc::clone(&state.observer),
        cancel: state.supervisor.child_token(),
    };
    let supervisor = state.supervisor.clone();

    upgrade
        .read_buffer_size(state.config.bridge.chunk_size)
        .on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {e}"))
        .on_upgrade(move |socket| supervisor.track(dispatch(AxumTransport::new(socket), target, ctx)))
}

/// Binds `config.bind_addr` and serves until the supervisor shuts down.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server(
    config: ServerConfig,
    observer: Arc<dyn SessionObserver>,
    supervisor: SessionSupervisor,
) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TunnelError::Bind { addr, source })
        .with_context(|| format!("failed to start tunnel server on {addr}"))?;

    serve(listener, config, observer, supervisor).await
}

/// Serves on an already-bound listener, then drains live sessions.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    observer: Arc<dyn SessionObserver>,
    supervisor: SessionSupervisor,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr().context("listener has no local address")?;
    let grace = config.shutdown_grace;
    let router = build_router(AppState::new(config, observer, supervisor.clone()));

    info!("tunnel server listening on {local_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(supervisor.shutdown_token().cancelled_owned())
        .await
        .context("tunnel server failed")?;

    info!("no longer accepting tunnels; closing {} session(s)", supervisor.active());
    supervisor.shutdown(grace).await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
