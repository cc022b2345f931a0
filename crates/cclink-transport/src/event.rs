use bytes::Bytes;

use crate::error::TransportError;

/// Events delivered by a connected transport, in socket order.
///
/// Only binary WebSocket messages become [`TransportEvent::Frame`]; text,
/// ping, and pong traffic is handled inside the transport and never reaches
/// the connection manager.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete binary frame arrived.
    Frame(Bytes),
    /// The remote closed the connection.
    Closed { code: u16, reason: String },
    /// The socket failed; no further events follow.
    Error(TransportError),
}
