//! Client for the CC live-streaming link service.
//!
//! cclink speaks the binary WebSocket protocol of the CC link service:
//! MessagePack bodies behind a fixed frame header, optional zlib-compressed
//! payloads, and service/command routed messages.
//!
//! # Crate Structure
//!
//! - [`codec`] — Frame encoding/decoding, message model, payload sanitation
//! - [`transport`] — WebSocket transport and the transport abstraction
//! - [`client`] — Connection management: reconnect, heartbeat, middleware,
//!   request/response correlation

/// Re-export codec types.
pub mod codec {
    pub use cclink_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use cclink_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use cclink_client::*;
}
