//! tunnel-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tunnel-client do?
//!
//! The client listens on a local TCP port.  For every connection a local
//! program opens, it dials `<serverURL>/<remoteHost>/<remotePort>` over
//! WebSocket and pumps bytes both ways.  The tunnel server on the other end
//! connects to `remoteHost:remotePort`, so the local program effectively talks
//! to the remote service.
//!
//! If the WebSocket drops abnormally the client keeps the local connection
//! open, buffers its bytes, and redials (see [`application::reconnect`]).

/// Domain layer: target addressing and configuration.
pub mod domain;

/// Application layer: the reconnecting session driver.
pub mod application;

/// Infrastructure layer: WebSocket connector and TCP listener.
pub mod infrastructure;
