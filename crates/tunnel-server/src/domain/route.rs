//! Tunnel path parsing.
//!
//! The destination of a session is the request path: `/<remoteHost>/<remotePort>`.
//! The error messages double as the plain-text bodies of the 400 responses.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid path format. Use /<remoteHost>/<remotePort>")]
    InvalidFormat,

    #[error("Invalid port number")]
    InvalidPort,
}

/// Destination decoded from a tunnel path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for TunnelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parses `/<remoteHost>/<remotePort>`.
///
/// Exactly two non-empty segments are required and the port must be in
/// `1..=65535`.
///
/// ```rust
/// use tunnel_server::domain::route::{parse_tunnel_path, RouteError};
///
/// let target = parse_tunnel_path("/echo.local/7").unwrap();
/// assert_eq!(target.to_string(), "echo.local:7");
/// assert_eq!(parse_tunnel_path("/onlyhost"), Err(RouteError::InvalidFormat));
/// ```
pub fn parse_tunnel_path(path: &str) -> Result<TunnelTarget, RouteError> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let mut segments = path.split('/');

    let (Some(host), Some(port), None) = (segments.next(), segments.next(), segments.next())
    else {
        return Err(RouteError::InvalidFormat);
    };
    if host.is_empty() || port.is_empty() {
        return Err(RouteError::InvalidFormat);
    }

    match port.parse::<u16>() {
        Ok(port) if port != 0 => Ok(TunnelTarget {
            host: host.to_string(),
            port,
        }),
        _ => Err(RouteError::InvalidPort),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        // Arrange / Act
        let target = parse_tunnel_path("/db.internal/5432").unwrap();

        // Assert
        assert_eq!(target.host, "db.internal");
        assert_eq!(target.port, 5432);
    }

    #[test]
    fn test_parse_ip_literal_host() {
        let target = parse_tunnel_path("/10.0.0.5/22").unwrap();
        assert_eq!(target.to_string(), "10.0.0.5:22");
    }

    #[test]
    fn test_single_segment_is_invalid_format() {
        assert_eq!(parse_tunnel_path("/onlyhost"), Err(RouteError::InvalidFormat));
    }

    #[test]
    fn test_three_segments_is_invalid_format() {
        assert_eq!(parse_tunnel_path("/a/b/c"), Err(RouteError::InvalidFormat));
    }

    #[test]
    fn test_trailing_slash_is_invalid_format() {
        assert_eq!(parse_tunnel_path("/host/80/"), Err(RouteError::InvalidFormat));
    }

    #[test]
    fn test_empty_segments_are_invalid_format() {
        assert_eq!(parse_tunnel_path("/"), Err(RouteError::InvalidFormat));
        assert_eq!(parse_tunnel_path("//80"), Err(RouteError::InvalidFormat));
        assert_eq!(parse_tunnel_path("/host/"), Err(RouteError::InvalidFormat));
    }

    #[test]
    fn test_non_integer_port_is_invalid_port() {
        assert_eq!(parse_tunnel_path("/host/notaport"), Err(RouteError::InvalidPort));
    }

    #[test]
    fn test_out_of_range_ports_are_invalid_port() {
        assert_eq!(parse_tunnel_path("/host/0"), Err(RouteError::InvalidPort));
        assert_eq!(parse_tunnel_path("/host/65536"), Err(RouteError::InvalidPort));
        assert_eq!(parse_tunnel_path("/host/-1"), Err(RouteError::InvalidPort));
    }

    #[test]
    fn test_error_messages_match_response_bodies() {
        assert_eq!(
            RouteError::InvalidFormat.to_string(),
            "Invalid path format. Use /<remoteHost>/<remotePort>"
        );
        assert_eq!(RouteError::InvalidPort.to_string(), "Invalid port number");
    }
}
