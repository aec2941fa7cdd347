//! WebSocket dialing.
//!
//! The listener and the reconnect driver only know the [`WsConnector`] trait;
//! [`TungsteniteConnector`] is the production implementation.  Tests plug in
//! connectors that hand out in-memory transports.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tracing::debug;

use tunnel_core::{FrameTransport, TransportError, TunnelError, TungsteniteTransport};

/// Opens one WebSocket connection per call.
#[async_trait]
pub trait WsConnector: Send + Sync {
    type Transport: FrameTransport + 'static;

    /// Dials `url` and completes the opening handshake.
    async fn connect(&self, url: &str) -> Result<Self::Transport, TunnelError>;
}

/// Dials with tokio-tungstenite, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl WsConnector for TungsteniteConnector {
    type Transport = TungsteniteTransport<MaybeTlsStream<TcpStream>>;

    async fn connect(&self, url: &str) -> Result<Self::Transport, TunnelError> {
        let handshake = tokio_tungstenite::connect_async(url);
        let (ws, response) = tokio::time::timeout(self.timeout, handshake)
            .await
            .map_err(|_| TunnelError::ConnectTimeout {
                target: url.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| TunnelError::Handshake {
                url: url.to_string(),
                source: TransportError::from(e),
            })?;
        debug!("WebSocket to {url} established (HTTP {})", response.status());
        Ok(TungsteniteTransport::new(ws))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_reports_handshake_failure_for_closed_port() {
        // Arrange: bind and drop a listener so the port is free
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let connector = TungsteniteConnector::new(Duration::from_secs(2));

        // Act
        let result = connector.connect(&format!("ws://{addr}/h/1")).await;

        // Assert
        assert!(matches!(result, Err(TunnelError::Handshake { .. })));
    }

    #[tokio::test]
    async fn test_connect_times_out_when_server_never_answers() {
        // Arrange: a listener that accepts TCP but never speaks HTTP
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });
        let connector = TungsteniteConnector::new(Duration::from_millis(100));

        // Act
        let result = connector.connect(&format!("ws://{addr}/h/1")).await;

        // Assert
        assert!(matches!(result, Err(TunnelError::ConnectTimeout { .. })));
    }

    #[tokio::test]
    async fn test_connect_completes_handshake() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio_tungstenite::accept_async(socket).await.is_ok()
        });
        let connector = TungsteniteConnector::new(Duration::from_secs(2));

        // Act
        let result = connector.connect(&format!("ws://{addr}/echo.local/7")).await;

        // Assert
        assert!(result.is_ok());
        assert!(server.await.unwrap());
    }
}
