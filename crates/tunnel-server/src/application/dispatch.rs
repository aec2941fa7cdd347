//! Use case: turn an accepted tunnel WebSocket into a running session.
//!
//! The WebSocket is already upgraded when this runs.  The destination is
//! dialed next; only when that succeeds does a session exist.

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tunnel_core::{
    Bridge, BridgeConfig, CloseReason, Frame, FrameTransport, SessionId, SessionObserver,
    TunnelError, CLOSE_INTERNAL_ERROR,
};

use crate::domain::TunnelTarget;

/// Per-session dependencies handed out by the HTTP layer.
#[derive(Clone)]
pub struct DispatchContext {
    pub bridge: BridgeConfig,
    pub connect_timeout: Duration,
    pub observer: Arc<dyn SessionObserver>,
    pub cancel: CancellationToken,
}

/// Opens the TCP connection to `target`, bounded by `timeout`.
pub async fn dial_destination(
    target: &TunnelTarget,
    timeout: Duration,
) -> Result<TcpStream, TunnelError> {
    let connect = TcpStream::connect((target.host.as_str(), target.port));
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(TunnelError::Connect {
            target: target.to_string(),
            source,
        }),
        Err(_) => Err(TunnelError::ConnectTimeout {
            target: target.to_string(),
            timeout,
        }),
    }
}

/// Dials `target` and bridges it with `ws` until the session ends.
///
/// A failed dial closes the WebSocket with 1011 and creates no session.
pub async fn dispatch<W>(mut ws: W, target: TunnelTarget, ctx: DispatchContext)
where
    W: FrameTransport,
{
    let dialed = tokio::select! {
        dialed = dial_destination(&target, ctx.connect_timeout) => dialed,
        _ = ctx.cancel.cancelled() => {
            debug!("tunnel to {target}: shutdown during dial");
            return;
        }
    };

    let tcp = match dialed {
        Ok(tcp) => tcp,
        Err(e) => {
            warn!("tunnel to {target}: {e}");
            let close = Frame::Close(Some(CloseReason::new(
                CLOSE_INTERNAL_ERROR,
                "Connection error",
            )));
            if let Err(e) = ws.send(close).await {
                debug!("tunnel to {target}: close after failed dial: {e}");
            }
            return;
        }
    };

    let id = SessionId::allocate(target.host.as_str(), target.port);
    info!("session {id}: connected to {target}");
    Bridge::new(id, tcp, ctx.bridge, ctx.observer)
        .with_cancellation(ctx.cancel)
        .run(ws)
        .await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
