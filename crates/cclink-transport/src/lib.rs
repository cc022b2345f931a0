//! WebSocket transport boundary for the CCLink client.
//!
//! The connection manager only assumes ordered, reliable, message-framed
//! byte delivery. That contract is captured by the [`Transport`] and
//! [`FrameSink`] traits plus the [`TransportEvent`] stream; [`WsTransport`]
//! is the production implementation over `tokio-tungstenite`.

pub mod error;
pub mod event;
pub mod traits;
pub mod ws;

pub use error::{Result, TransportError};
pub use event::TransportEvent;
pub use traits::{FrameSink, Transport, EVENT_BUFFER};
pub use ws::{WsSink, WsTransport};
