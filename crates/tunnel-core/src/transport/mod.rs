//! WebSocket transport abstraction.
//!
//! - **`frame`** – [`Frame`], close codes, [`TransportError`], and the
//!   [`FrameTransport`] trait the bridge is generic over.
//! - **`tungstenite`** – adapter for tokio-tungstenite streams, used by the
//!   client and by tests.

pub mod frame;
pub mod tungstenite;

pub use frame::{
    CloseReason, Frame, FrameTransport, TransportError, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL,
};
pub use tungstenite::TungsteniteTransport;
