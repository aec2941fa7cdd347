//! Domain layer: tunnel path parsing and server configuration.  No I/O.

pub mod config;
pub mod route;

pub use config::ServerConfig;
pub use route::{parse_tunnel_path, RouteError, TunnelTarget};
