//! The session bridge: pumps bytes between one TCP endpoint and one WebSocket.
//!
//! ```text
//!            ┌──────────── Bridge ─────────────┐
//!  TCP  ───► │ tcp→ws pump: read ≤ chunk_size  │ ───► Binary frame
//!            │              + keep-alive pings │
//!  TCP  ◄─── │ ws→tcp pump: write_all(payload) │ ◄─── Binary frame
//!            └─────────────────────────────────┘
//! ```
//!
//! Both pumps are polled concurrently inside one `tokio::select!`.  Whichever
//! finishes first decides the [`TerminationReason`]; the other pump's future
//! is dropped, which cancels its in-flight read or write immediately.  The
//! WebSocket leg is then closed with 1000 or 1011 and, unless the caller wants
//! to reconnect, the TCP endpoint is shut down.
//!
//! # Layering
//!
//! [`Bridge::run`] is the complete server-side lifecycle.  The client drives
//! the lower-level pieces itself ([`Bridge::forward`], [`Bridge::hold`],
//! [`Bridge::finish`]) so that it can swap the WebSocket leg without touching
//! the TCP endpoint.  The bridge never redials anything on its own.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::{interval_at, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::domain::{
    BridgeConfig, ForwardStats, Session, SessionEvent, SessionId, SessionObserver, SessionState,
    TerminationReason,
};
use crate::transport::{CloseReason, Frame, FrameTransport, TransportError};

/// Result of [`Bridge::hold`].
#[derive(Debug)]
pub enum Hold<T> {
    /// The awaited future completed while the TCP endpoint stayed open.
    Ready(T),
    /// The TCP endpoint (or the cancellation signal) ended the session first.
    Ended(TerminationReason),
}

/// Owns the TCP endpoint of one session and pumps it against WebSocket legs.
pub struct Bridge<T> {
    session: Session,
    tcp_reader: ReadHalf<T>,
    tcp_writer: WriteHalf<T>,
    config: BridgeConfig,
    observer: Arc<dyn SessionObserver>,
    cancel: CancellationToken,
    stats: ForwardStats,
    /// TCP bytes read but not yet delivered to a WebSocket.
    pending: BytesMut,
    started: Instant,
}

impl<T> Bridge<T>
where
    T: AsyncRead + AsyncWrite + Send,
{
    /// Creates the bridge for a freshly established session and reports
    /// [`SessionEvent::Created`].
    ///
    /// Call this only once both endpoints exist: a `Bridge` is a live session.
    pub fn new(
        id: SessionId,
        tcp: T,
        config: BridgeConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (tcp_reader, tcp_writer) = tokio::io::split(tcp);
        let session = Session::new(id);
        observer.on_session_event(&SessionEvent::Created {
            id: session.id().clone(),
            created_at: session.created_at(),
        });
        Self {
            session,
            tcp_reader,
            tcp_writer,
            config,
            observer,
            cancel: CancellationToken::new(),
            stats: ForwardStats::default(),
            pending: BytesMut::new(),
            started: Instant::now(),
        }
    }

    /// Ties the bridge to an external cancellation signal (usually a child of
    /// the supervisor's shutdown token).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn id(&self) -> &SessionId {
        self.session.id()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> ForwardStats {
        self.stats
    }

    /// Number of TCP bytes waiting for a WebSocket leg.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn observer(&self) -> &Arc<dyn SessionObserver> {
        &self.observer
    }

    /// Moves the session to `state`; ignored once terminated.
    pub fn set_state(&mut self, state: SessionState) {
        if self.session.transition(state) {
            debug!("session {}: state -> {state}", self.session.id());
        }
    }

    /// Runs the whole session over `ws` and tears both endpoints down.
    pub async fn run<W>(mut self, ws: W) -> TerminationReason
    where
        W: FrameTransport,
    {
        let reason = self.forward(ws).await;
        self.finish(reason).await
    }

    /// Pumps bytes over one WebSocket leg until either side ends, then closes
    /// that leg.  The TCP endpoint stays open.
    ///
    /// Bytes still pending from an earlier leg are sent first.  A chunk whose
    /// send fails stays pending, so a later leg can deliver it.
    pub async fn forward<W>(&mut self, ws: W) -> TerminationReason
    where
        W: FrameTransport,
    {
        let (mut ws_sink, mut ws_stream) = ws.split();
        let liveness = Liveness::new();

        let reason = {
            let id = self.session.id();
            let keepalive = Keepalive::new(&self.config, &liveness);
            let tcp_to_ws = pump_tcp_to_ws(
                &mut self.tcp_reader,
                &mut ws_sink,
                &mut self.pending,
                &mut self.stats.tcp_to_ws,
                self.config.chunk_size,
                keepalive,
                id,
            );
            let ws_to_tcp = pump_ws_to_tcp(
                &mut ws_stream,
                &mut self.tcp_writer,
                &mut self.stats.ws_to_tcp,
                &liveness,
                id,
            );

            tokio::select! {
                reason = tcp_to_ws => reason,
                reason = ws_to_tcp => reason,
                _ = self.cancel.cancelled() => TerminationReason::Shutdown,
            }
        };

        debug!("session {}: WebSocket leg ended: {reason}", self.session.id());
        close_leg(
            ws_sink,
            ws_stream,
            &reason,
            self.config.close_timeout,
            self.session.id(),
        )
        .await;
        reason
    }

    /// Keeps the TCP endpoint open while `fut` runs, buffering up to `limit`
    /// bytes read from TCP.
    ///
    /// Reading stops once `limit` is reached (the TCP peer sees back-pressure).
    /// Returns [`Hold::Ended`] if the TCP side closes or fails first, or if the
    /// session is cancelled.
    pub async fn hold<F>(&mut self, fut: F, limit: usize) -> Hold<F::Output>
    where
        F: Future,
    {
        tokio::pin!(fut);
        let mut buf = vec![0u8; self.config.chunk_size.max(1)];

        loop {
            let room = limit.saturating_sub(self.pending.len()).min(buf.len());
            if room == 0 {
                return tokio::select! {
                    out = &mut fut => Hold::Ready(out),
                    _ = self.cancel.cancelled() => Hold::Ended(TerminationReason::Shutdown),
                };
            }

            tokio::select! {
                out = &mut fut => return Hold::Ready(out),
                _ = self.cancel.cancelled() => return Hold::Ended(TerminationReason::Shutdown),
                read = self.tcp_reader.read(&mut buf[..room]) => match read {
                    Ok(0) => return Hold::Ended(TerminationReason::TcpClosed),
                    Ok(n) => {
                        trace!("session {}: buffered {n} bytes while WebSocket is down", self.session.id());
                        self.pending.extend_from_slice(&buf[..n]);
                    }
                    Err(e) => return Hold::Ended(TerminationReason::TcpError(e.to_string())),
                },
            }
        }
    }

    /// Shuts the TCP endpoint down, discards buffered bytes, and reports
    /// [`SessionEvent::Terminated`].
    pub async fn finish(mut self, reason: TerminationReason) -> TerminationReason {
        if let Err(e) = self.tcp_writer.shutdown().await {
            debug!("session {}: TCP shutdown failed: {e}", self.session.id());
        }
        if !self.pending.is_empty() {
            debug!(
                "session {}: discarding {} buffered bytes",
                self.session.id(),
                self.pending.len()
            );
            self.pending.clear();
        }
        self.session.transition(SessionState::Terminated);
        self.observer.on_session_event(&SessionEvent::Terminated {
            id: self.session.id().clone(),
            reason: reason.clone(),
            stats: self.stats,
            duration: self.started.elapsed(),
        });
        reason
    }
}

// ── Keep-alive ────────────────────────────────────────────────────────────────

/// Inbound-traffic clock for one WebSocket leg.
///
/// The ws→tcp pump stamps it on every frame.  While that pump is parked in a
/// TCP write the stream is not being read, so pongs sit unread; silence does
/// not accumulate during that time.
struct Liveness {
    leg_started: Instant,
    last_inbound_ms: AtomicU64,
    writing: AtomicBool,
}

impl Liveness {
    fn new() -> Self {
        Self {
            leg_started: Instant::now(),
            last_inbound_ms: AtomicU64::new(0),
            writing: AtomicBool::new(false),
        }
    }

    fn touch(&self) {
        let elapsed_ms = u64::try_from(self.leg_started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_inbound_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    fn set_writing(&self, writing: bool) {
        self.writing.store(writing, Ordering::Relaxed);
        self.touch();
    }

    fn silence(&self) -> Duration {
        if self.writing.load(Ordering::Relaxed) {
            return Duration::ZERO;
        }
        let last = Duration::from_millis(self.last_inbound_ms.load(Ordering::Relaxed));
        self.leg_started.elapsed().saturating_sub(last)
    }
}

/// Ping timer plus the silence check, owned by the tcp→ws pump because that
/// pump owns the WebSocket sink.
struct Keepalive<'a> {
    ticker: Option<Interval>,
    timeout: Duration,
    liveness: &'a Liveness,
}

impl<'a> Keepalive<'a> {
    fn new(config: &BridgeConfig, liveness: &'a Liveness) -> Self {
        let ticker = config.keepalive_enabled().then(|| {
            let period = config.keepalive_interval;
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        Self {
            ticker,
            timeout: config.keepalive_timeout,
            liveness,
        }
    }

    /// Resolves at the next ping time; never resolves when disabled.
    async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// The current silence, if it exceeds the keep-alive timeout.
    fn expired(&self) -> Option<Duration> {
        let silence = self.liveness.silence();
        (silence > self.timeout).then_some(silence)
    }
}

// ── Pumps ─────────────────────────────────────────────────────────────────────

async fn pump_tcp_to_ws<R, W>(
    reader: &mut R,
    sink: &mut SplitSink<W, Frame>,
    pending: &mut BytesMut,
    forwarded: &mut u64,
    chunk_size: usize,
    mut keepalive: Keepalive<'_>,
    id: &SessionId,
) -> TerminationReason
where
    R: AsyncRead + Unpin,
    W: FrameTransport,
{
    let chunk_size = chunk_size.max(1);
    let mut buf = vec![0u8; chunk_size];

    loop {
        while !pending.is_empty() {
            let n = pending.len().min(chunk_size);
            let chunk = Bytes::copy_from_slice(&pending[..n]);
            if let Err(reason) = send_frame(sink, Frame::Binary(chunk), &mut keepalive, id).await {
                return reason;
            }
            pending.advance(n);
            *forwarded += n as u64;
            trace!("session {id}: sent {n} bytes to WebSocket");
        }

        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    debug!("session {id}: TCP peer closed (EOF)");
                    return TerminationReason::TcpClosed;
                }
                Ok(n) => pending.extend_from_slice(&buf[..n]),
                Err(e) => return TerminationReason::TcpError(e.to_string()),
            },
            _ = keepalive.tick() => {
                if let Some(silence) = keepalive.expired() {
                    debug!("session {id}: no WebSocket traffic for {silence:?}");
                    return TerminationReason::KeepaliveTimeout;
                }
                let ping = Frame::Ping(Bytes::new());
                if let Err(reason) = send_frame(sink, ping, &mut keepalive, id).await {
                    return reason;
                }
                trace!("session {id}: sent keep-alive ping");
            }
        }
    }
}

/// Sends one frame.  While the sink is blocked the keep-alive deadline is
/// still checked on every tick, so a peer that stopped reading cannot park
/// the pump forever.
async fn send_frame<W>(
    sink: &mut SplitSink<W, Frame>,
    frame: Frame,
    keepalive: &mut Keepalive<'_>,
    id: &SessionId,
) -> Result<(), TerminationReason>
where
    W: FrameTransport,
{
    let send = sink.send(frame);
    tokio::pin!(send);

    loop {
        tokio::select! {
            sent = &mut send => return sent.map_err(|e| TerminationReason::WsError(e.to_string())),
            _ = keepalive.tick() => {
                if let Some(silence) = keepalive.expired() {
                    debug!("session {id}: WebSocket send stalled, no traffic for {silence:?}");
                    return Err(TerminationReason::KeepaliveTimeout);
                }
            }
        }
    }
}

async fn pump_ws_to_tcp<W, T>(
    stream: &mut SplitStream<W>,
    writer: &mut T,
    forwarded: &mut u64,
    liveness: &Liveness,
    id: &SessionId,
) -> TerminationReason
where
    W: FrameTransport,
    T: AsyncWrite + Unpin,
{
    loop {
        let frame = match stream.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return TerminationReason::WsError(e.to_string()),
            None => return TerminationReason::WsError(TransportError::Closed.to_string()),
        };
        liveness.touch();

        match frame {
            Frame::Binary(data) => {
                liveness.set_writing(true);
                let written = match writer.write_all(&data).await {
                    Ok(()) => writer.flush().await,
                    Err(e) => Err(e),
                };
                liveness.set_writing(false);
                if let Err(e) = written {
                    return TerminationReason::TcpError(e.to_string());
                }
                *forwarded += data.len() as u64;
                trace!("session {id}: wrote {} bytes to TCP", data.len());
            }
            Frame::Close(close) => {
                debug!("session {id}: WebSocket close frame received: {close:?}");
                return TerminationReason::WsClosed;
            }
            Frame::Text(text) => {
                debug!("session {id}: ignoring text message ({} bytes)", text.len());
            }
            Frame::Ping(_) | Frame::Pong(_) => {
                trace!("session {id}: control frame received");
            }
        }
    }
}

// ── Teardown ──────────────────────────────────────────────────────────────────

/// Best-effort close handshake on one WebSocket leg.
///
/// Sends a close frame carrying `reason.close_code()` (or just flushes the
/// automatic reply when the peer closed first), then waits for the peer to
/// finish.  The whole sequence is bounded by `close_timeout`, so a peer that
/// stopped reading cannot hold the session open.  Failures are only logged.
async fn close_leg<W>(
    mut sink: SplitSink<W, Frame>,
    mut stream: SplitStream<W>,
    reason: &TerminationReason,
    close_timeout: Duration,
    id: &SessionId,
) where
    W: FrameTransport,
{
    let handshake = async {
        let sent = if *reason == TerminationReason::WsClosed {
            sink.close().await
        } else {
            let text = if reason.is_normal() {
                "Connection closed"
            } else {
                "Connection error"
            };
            sink.send(Frame::Close(Some(CloseReason::new(reason.close_code(), text))))
                .await
        };
        if let Err(e) = sent {
            debug!("session {id}: WebSocket close failed: {e}");
            return;
        }
        while let Some(Ok(frame)) = stream.next().await {
            if matches!(frame, Frame::Close(_)) {
                break;
            }
        }
    };

    if tokio::time::timeout(close_timeout, handshake).await.is_err() {
        debug!("session {id}: close handshake did not finish in {close_timeout:?}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
