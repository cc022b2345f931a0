use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::message::{Message, Payload};
use crate::sanitize::strip_crlf_escapes;

/// Frame header: service id (2) + command id (2) + compression flag (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Header size when the compression flag is set: the plain header plus a
/// 4-byte declared length for the compressed span.
pub const COMPRESSED_HEADER_SIZE: usize = 12;

/// How the body of a decoded frame was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBody {
    /// The body followed the header as raw MessagePack.
    Plain,
    /// The body was a zlib stream and inflated successfully.
    Inflated,
    /// The compression flag was set but the declared length did not match
    /// the actual span. The remote contract treats the body as empty in
    /// this case instead of raising an error; the variant lets callers
    /// observe that it happened.
    LengthMismatch { declared: u32, actual: usize },
}

/// A decoded frame: the message plus how its body was carried.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub message: Message,
    pub body: FrameBody,
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────────┬───────────────┬───────────────┬──────────────────┐
/// │ Service (2B)  │ Command (2B)  │ Flag (4B LE)  │ MessagePack body │
/// │ LE            │ LE            │ always 0      │                  │
/// └───────────────┴───────────────┴───────────────┴──────────────────┘
/// ```
///
/// Outbound frames are never compressed, so the flag is always written as
/// zero. Encoding is deterministic: the payload map is written in insertion
/// order.
pub fn encode_message(message: &Message) -> Result<Bytes> {
    // to_vec_named keeps MessagePack maps keyed by name; the remote endpoint
    // does not understand positional encoding.
    let body = rmp_serde::to_vec_named(&message.payload)?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u16_le(message.service_id);
    buf.put_u16_le(message.command_id);
    buf.put_u32_le(0);
    buf.put_slice(&body);
    Ok(buf.freeze())
}

/// Decode a wire frame into a message.
///
/// If the compression flag (bytes 4–7) is nonzero, bytes 8–11 hold the
/// declared byte count of the compressed span starting at byte 12. The span
/// is inflated only when the declared count matches; on mismatch the body is
/// treated as empty (see [`FrameBody::LengthMismatch`]).
///
/// After MessagePack decoding, the payload goes through the sanitation pass
/// ([`strip_crlf_escapes`]) that removes line-break artifacts the remote
/// occasionally embeds in string fields.
pub fn decode_message(frame: &[u8]) -> Result<DecodedFrame> {
    if frame.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            len: frame.len(),
            need: HEADER_SIZE,
        });
    }

    let service_id = u16::from_le_bytes([frame[0], frame[1]]);
    let command_id = u16::from_le_bytes([frame[2], frame[3]]);
    let flag = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);

    let (body, kind) = if flag != 0 {
        if frame.len() < COMPRESSED_HEADER_SIZE {
            return Err(CodecError::Truncated {
                len: frame.len(),
                need: COMPRESSED_HEADER_SIZE,
            });
        }
        let declared = u32::from_le_bytes([frame[8], frame[9], frame[10], frame[11]]);
        let span = &frame[COMPRESSED_HEADER_SIZE..];
        if span.len() == declared as usize {
            (inflate(span)?, FrameBody::Inflated)
        } else {
            (
                Vec::new(),
                FrameBody::LengthMismatch {
                    declared,
                    actual: span.len(),
                },
            )
        }
    } else {
        (frame[HEADER_SIZE..].to_vec(), FrameBody::Plain)
    };

    // Only the length-mismatch fallback produces an empty body; everything
    // else goes through the MessagePack decoder, which rejects empty input.
    let payload = if matches!(kind, FrameBody::LengthMismatch { .. }) {
        Payload::new()
    } else {
        let value: Value = rmp_serde::from_slice(&body)?;
        match strip_crlf_escapes(value)? {
            Value::Object(map) => map,
            _ => return Err(CodecError::PayloadNotAMap),
        }
    };

    Ok(DecodedFrame {
        message: Message::with_payload(service_id, command_id, payload),
        body: kind,
    })
}

fn inflate(span: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(span)
        .read_to_end(&mut out)
        .map_err(CodecError::Inflate)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use flate2::read::ZlibEncoder;
    use flate2::Compression;
    use serde_json::json;

    use super::*;

    /// The follow-user request, captured from the live endpoint.
    const FOLLOW_FRAME_HEX: &str =
        "02a003000000000082aa666f6c6c6f775f756964ce0ffbc6bca3756964ce0ffbc6bc";

    fn follow_message() -> Message {
        Message::new(40962, 3)
            .with("follow_uid", 268158652u32)
            .with("uid", 268158652u32)
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn encode_matches_captured_frame() {
        let frame = encode_message(&follow_message()).unwrap();
        assert_eq!(hex(&frame), FOLLOW_FRAME_HEX);
    }

    #[test]
    fn decode_matches_captured_frame() {
        let decoded = decode_message(&unhex(FOLLOW_FRAME_HEX)).unwrap();
        assert_eq!(decoded.message, follow_message());
        assert_eq!(decoded.body, FrameBody::Plain);
    }

    #[test]
    fn roundtrip_reconstructs_identifiers_and_payload() {
        let msg = Message::new(512, 7)
            .with("name", "anchor")
            .with("level", 33)
            .with("tags", json!(["a", "b"]))
            .with("meta", json!({"room": 1001, "hot": true}));

        let frame = encode_message(&msg).unwrap();
        let decoded = decode_message(&frame).unwrap();

        assert_eq!(decoded.message, msg);
    }

    #[test]
    fn encoding_is_deterministic() {
        let msg = follow_message();
        let a = encode_message(&msg).unwrap();
        let b = encode_message(&msg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_payload_encodes_to_header_plus_empty_map() {
        let frame = encode_message(&Message::new(6144, 5)).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 1);
        assert_eq!(frame[HEADER_SIZE], 0x80); // fixmap, zero entries
    }

    #[test]
    fn decode_compressed_body() {
        let msg = Message::new(515, 4).with("chat", "hello");
        let body = rmp_serde::to_vec_named(&msg.payload).unwrap();

        let mut compressed = Vec::new();
        ZlibEncoder::new(&body[..], Compression::default())
            .read_to_end(&mut compressed)
            .unwrap();

        let mut frame = BytesMut::new();
        frame.put_u16_le(515);
        frame.put_u16_le(4);
        frame.put_u32_le(1);
        frame.put_u32_le(compressed.len() as u32);
        frame.put_slice(&compressed);

        let decoded = decode_message(&frame).unwrap();
        assert_eq!(decoded.message, msg);
        assert_eq!(decoded.body, FrameBody::Inflated);
    }

    #[test]
    fn compressed_length_mismatch_yields_empty_payload() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(515);
        frame.put_u16_le(4);
        frame.put_u32_le(1);
        frame.put_u32_le(9999); // declared length does not match the span
        frame.put_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let decoded = decode_message(&frame).unwrap();
        assert!(decoded.message.payload.is_empty());
        assert_eq!(decoded.message.service_id, 515);
        assert_eq!(decoded.message.command_id, 4);
        assert_eq!(
            decoded.body,
            FrameBody::LengthMismatch {
                declared: 9999,
                actual: 4
            }
        );
    }

    #[test]
    fn truncated_header_is_an_error() {
        let err = decode_message(&[0x02, 0xa0, 0x03]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { len: 3, need: 8 }));
    }

    #[test]
    fn truncated_compressed_header_is_an_error() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(1);
        frame.put_u16_le(1);
        frame.put_u32_le(1);
        frame.put_u16_le(0); // flag set, but no room for the declared length

        let err = decode_message(&frame).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { len: 10, need: 12 }));
    }

    #[test]
    fn header_only_frame_is_a_decode_error() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(6144);
        frame.put_u16_le(5);
        frame.put_u32_le(0);

        // An empty plain body is not a valid MessagePack document; only the
        // compressed length-mismatch path maps to an empty payload.
        let err = decode_message(&frame).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(1);
        frame.put_u16_le(1);
        frame.put_u32_le(0);
        frame.put_slice(&[0xc1]); // reserved MessagePack byte

        let err = decode_message(&frame).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn non_map_body_is_rejected() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(1);
        frame.put_u16_le(1);
        frame.put_u32_le(0);
        frame.put_slice(&rmp_serde::to_vec_named(&"just a string").unwrap());

        let err = decode_message(&frame).unwrap_err();
        assert!(matches!(err, CodecError::PayloadNotAMap));
    }

    #[test]
    fn crlf_artifacts_are_stripped_on_decode() {
        let msg = Message::new(515, 4).with("chat", "line one\r\nline two");
        let frame = encode_message(&msg).unwrap();

        let decoded = decode_message(&frame).unwrap();
        assert_eq!(
            decoded.message.get("chat"),
            Some(&json!("line oneline two"))
        );
    }
}
