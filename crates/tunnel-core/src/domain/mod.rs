//! Domain layer: session identity, lifecycle events, and configuration.
//!
//! Nothing in here performs I/O.  The types describe *what* a session is and
//! what can happen to it; the [`bridge`](crate::bridge) module makes it happen.

pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use config::BridgeConfig;
pub use error::TunnelError;
pub use events::{RecordingObserver, SessionEvent, SessionObserver, TracingObserver};
pub use session::{ForwardStats, Session, SessionId, SessionState, TerminationReason};
