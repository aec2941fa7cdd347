//! Domain layer: target addressing and client configuration.  No I/O.

pub mod config;
pub mod target;

pub use config::{ClientConfig, ReconnectConfig};
pub use target::{TargetDescriptor, TargetError};
