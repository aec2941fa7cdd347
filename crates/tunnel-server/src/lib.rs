//! tunnel-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tunnel-server do?
//!
//! The server accepts WebSocket upgrades at `/<remoteHost>/<remotePort>`,
//! connects to `remoteHost:remotePort` over TCP, and pumps bytes between the
//! two until either side ends.  `GET /health` answers `200 OK` for load
//! balancers and probes.
//!
//! # Architecture overview
//!
//! ```text
//! tunnel-client (binary WebSocket messages)
//!       ↕
//! tunnel-server  ← this process
//!   domain/          path parsing, ServerConfig
//!   application/     dial destination, run the session bridge
//!   infrastructure/  axum router + WebSocket adapter
//!       ↕
//! destination service (raw TCP)
//! ```

/// Domain layer: tunnel path parsing and configuration.
pub mod domain;

/// Application layer: destination dial and session dispatch.
pub mod application;

/// Infrastructure layer: HTTP server and WebSocket adapter.
pub mod infrastructure;
