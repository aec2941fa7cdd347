//! Errors that stop a session from being created.
//!
//! Once a session exists its failures are [`TerminationReason`](super::TerminationReason)s,
//! never errors; these variants only describe setup (bind, dial, handshake).

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum TunnelError {
    /// The local listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A TCP dial to the destination failed.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A TCP or WebSocket dial did not complete in time.
    #[error("timed out after {timeout:?} connecting to {target}")]
    ConnectTimeout { target: String, timeout: Duration },

    /// The WebSocket opening handshake failed.
    #[error("WebSocket handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: TransportError,
    },
}
