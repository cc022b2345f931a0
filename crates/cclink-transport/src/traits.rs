use std::future::Future;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::TransportEvent;

/// Capacity of the inbound event channel handed out by [`Transport::connect`].
pub const EVENT_BUFFER: usize = 64;

/// A dialer for one logical connection.
///
/// `connect` resolves once the socket is established, yielding the write
/// half and the inbound event stream. Implementations own their read task;
/// dropping the receiver tears it down.
pub trait Transport: Send + Sync + 'static {
    /// The write half produced by a successful dial.
    type Sink: FrameSink;

    /// Dial the endpoint.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<(Self::Sink, mpsc::Receiver<TransportEvent>)>> + Send;
}

/// The write half of a connected transport.
pub trait FrameSink: Send + 'static {
    /// Send one binary frame.
    fn send(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Request an orderly close. The matching [`TransportEvent::Closed`]
    /// arrives on the event stream once the remote acknowledges.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
