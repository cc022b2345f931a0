/// Errors that can occur on the WebSocket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the WebSocket connection.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    /// A frame could not be written to the socket.
    #[error("websocket send failed: {0}")]
    Send(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    /// The socket read side failed.
    #[error("websocket read failed: {0}")]
    Read(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    /// The transport is no longer usable.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
