//! Where the tunnel leads: server URL plus the final destination.
//!
//! The destination is encoded in the WebSocket URL path, so building that URL
//! is the only thing this module does.

use thiserror::Error;

/// Rejected target arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("server URL must not be empty")]
    EmptyServerUrl,

    /// The remote host would not survive as a single path segment.
    #[error("invalid remote host '{0}': must be non-empty and must not contain '/'")]
    InvalidHost(String),

    #[error("remote port must be between 1 and 65535")]
    InvalidPort,
}

/// Server base URL, destination host, and destination port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    server_url: String,
    remote_host: String,
    remote_port: u16,
}

impl TargetDescriptor {
    pub fn new(
        server_url: impl Into<String>,
        remote_host: impl Into<String>,
        remote_port: u16,
    ) -> Result<Self, TargetError> {
        let server_url = server_url.into().trim().to_string();
        let remote_host = remote_host.into().trim().to_string();

        if server_url.is_empty() {
            return Err(TargetError::EmptyServerUrl);
        }
        if remote_host.is_empty() || remote_host.contains('/') {
            return Err(TargetError::InvalidHost(remote_host));
        }
        if remote_port == 0 {
            return Err(TargetError::InvalidPort);
        }

        Ok(Self {
            server_url,
            remote_host,
            remote_port,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// The session URL: `<server base>/<remoteHost>/<remotePort>`.
    ///
    /// The base gets a `ws://` scheme when it has no WebSocket scheme
    /// (`http://` and `https://` become `ws://` and `wss://`), and trailing
    /// slashes are dropped.
    ///
    /// ```rust
    /// use tunnel_client::domain::TargetDescriptor;
    ///
    /// let target = TargetDescriptor::new("localhost:8080/", "echo.local", 7).unwrap();
    /// assert_eq!(target.ws_url(), "ws://localhost:8080/echo.local/7");
    /// ```
    pub fn ws_url(&self) -> String {
        let base = normalize_scheme(&self.server_url);
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.remote_host,
            self.remote_port
        )
    }

    /// `true` when the session URL uses TLS (`wss://`).
    pub fn is_secure(&self) -> bool {
        self.ws_url().starts_with("wss://")
    }
}

fn normalize_scheme(url: &str) -> String {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        format!("ws://{url}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
