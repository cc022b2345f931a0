use std::time::Duration;

/// Errors surfaced to callers of the client API.
///
/// Transport failures are not in this list on purpose: they are delivered as
/// [`ClientEvent`](crate::ClientEvent) notifications and drive the reconnect
/// state machine instead of failing individual calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Outbound messages must carry nonzero service and command identifiers.
    #[error("message is missing service/command identifiers")]
    MissingIdentifiers,

    /// The message could not be encoded (or a response decoded).
    #[error("codec error: {0}")]
    Codec(#[from] cclink_codec::CodecError),

    /// No response arrived inside the correlation window.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// A newer request on the same route key replaced this one before its
    /// response arrived. The pending table keys on `service_id`/`command_id`
    /// alone, so concurrent identical requests race by design.
    #[error("request superseded by a newer request on the same route")]
    Superseded,

    /// The background worker task is gone; the client is unusable.
    #[error("client worker has shut down")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, ClientError>;
