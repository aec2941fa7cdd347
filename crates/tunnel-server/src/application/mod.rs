//! Application layer: session dispatch for accepted tunnel WebSockets.

pub mod dispatch;

pub use dispatch::{dial_destination, dispatch, DispatchContext};
