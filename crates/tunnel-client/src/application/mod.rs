//! Application layer: session use cases for the client.

pub mod reconnect;

pub use reconnect::{drive_session, ReconnectPolicy, ReconnectState};
