//! Infrastructure layer: WebSocket dialing and the local TCP listener.

pub mod connector;
pub mod listener;

pub use connector::{TungsteniteConnector, WsConnector};
pub use listener::{run_listener, serve};
