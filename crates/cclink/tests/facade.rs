//! The facade re-exports must expose the full public API of each layer.

use cclink::client::{ClientConfig, HEARTBEAT_ROUTE};
use cclink::codec::{decode_message, encode_message, Message, RouteKey};

#[test]
fn codec_is_usable_through_the_facade() {
    let message = Message::new(40962, 3)
        .with("follow_uid", 268_158_652u32)
        .with("uid", 268_158_652u32);
    let frame = encode_message(&message).unwrap();
    let decoded = decode_message(&frame).unwrap();
    assert_eq!(decoded.message, message);
}

#[test]
fn client_constants_are_re_exported() {
    assert_eq!(HEARTBEAT_ROUTE, RouteKey::new(6144, 5));
    assert_eq!(ClientConfig::default().url(), "wss://weblink.cc.163.com/");
}
