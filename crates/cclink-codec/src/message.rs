use std::fmt;

use serde_json::{Map, Value};

/// The message body: an insertion-ordered key/value mapping.
///
/// Ordering matters — encoding the same message twice must produce
/// byte-identical frames, and MessagePack maps are written in map order.
pub type Payload = Map<String, Value>;

/// The pair of identifiers that selects a remote operation.
///
/// Inbound messages are routed to subscribers and pending requests by this
/// key. The original protocol spells it `"{service_id}-{command_id}"`; the
/// `Display` impl keeps that spelling for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub service_id: u16,
    pub command_id: u16,
}

impl RouteKey {
    pub const fn new(service_id: u16, command_id: u16) -> Self {
        Self {
            service_id,
            command_id,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.service_id, self.command_id)
    }
}

/// A single application-level message.
///
/// The identifiers are carried in the frame header, never inside the encoded
/// payload. Immutable once handed to the client for sending.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Target service/interface on the remote side (`ccsid` upstream).
    pub service_id: u16,
    /// Operation within that service (`cccid` upstream).
    pub command_id: u16,
    /// The message body, identifiers excluded.
    pub payload: Payload,
}

impl Message {
    /// Create a message with an empty payload.
    pub fn new(service_id: u16, command_id: u16) -> Self {
        Self {
            service_id,
            command_id,
            payload: Payload::new(),
        }
    }

    /// Create a message with an explicit payload.
    pub fn with_payload(service_id: u16, command_id: u16, payload: Payload) -> Self {
        Self {
            service_id,
            command_id,
            payload,
        }
    }

    /// Add a payload field, preserving insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The correlation key formed from this message's identifiers.
    pub fn route(&self) -> RouteKey {
        RouteKey::new(self.service_id, self.command_id)
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_key_display_matches_upstream_event_names() {
        let key = RouteKey::new(40962, 3);
        assert_eq!(key.to_string(), "40962-3");
    }

    #[test]
    fn builder_preserves_insertion_order() {
        let msg = Message::new(1, 2).with("b", 1).with("a", 2);
        let keys: Vec<&String> = msg.payload.keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn payload_lookup() {
        let msg = Message::new(1, 2).with("uid", 42);
        assert_eq!(msg.get("uid"), Some(&serde_json::json!(42)));
        assert_eq!(msg.get("missing"), None);
    }
}
