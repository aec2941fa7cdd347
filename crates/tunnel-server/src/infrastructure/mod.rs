//! Infrastructure layer for the tunnel server.
//!
//! - [`http`]: axum router, health check, upgrade handler, serve loop.
//! - [`axum_transport`]: axum WebSocket adapter for the session bridge.

pub mod axum_transport;
pub mod http;

pub use axum_transport::AxumTransport;
pub use http::{build_router, run_server, serve, AppState};
