/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is shorter than its fixed header.
    #[error("frame too short ({len} bytes, need at least {need})")]
    Truncated { len: usize, need: usize },

    /// The payload could not be serialized to MessagePack.
    #[error("messagepack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The body could not be parsed as MessagePack.
    #[error("messagepack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The compressed body is not a valid zlib stream.
    #[error("inflate error: {0}")]
    Inflate(#[source] std::io::Error),

    /// The payload sanitation pass failed to round-trip the body through JSON.
    #[error("payload sanitation error: {0}")]
    Sanitize(#[from] serde_json::Error),

    /// The decoded body is not a key/value map.
    #[error("decoded payload is not a map")]
    PayloadNotAMap,
}

pub type Result<T> = std::result::Result<T, CodecError>;
