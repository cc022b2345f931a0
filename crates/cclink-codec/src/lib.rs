//! Binary wire codec for the CCLink protocol.
//!
//! Every message on the wire is framed with:
//! - A 2-byte little-endian service identifier
//! - A 2-byte little-endian command identifier
//! - A 4-byte little-endian compression flag (always zero on encode)
//! - A MessagePack-encoded payload map, optionally zlib-deflated inbound
//!
//! The codec is pure: no I/O, no state. Connection handling lives in
//! `cclink-client`.

pub mod error;
pub mod frame;
pub mod message;
pub mod sanitize;

pub use error::{CodecError, Result};
pub use frame::{
    decode_message, encode_message, DecodedFrame, FrameBody, COMPRESSED_HEADER_SIZE, HEADER_SIZE,
};
pub use message::{Message, Payload, RouteKey};
pub use sanitize::strip_crlf_escapes;
