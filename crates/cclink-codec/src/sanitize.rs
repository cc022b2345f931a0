use serde_json::Value;

use crate::error::Result;

/// Payload sanitation pass applied to every decoded body.
///
/// The remote MessagePack data occasionally embeds CRLF artifacts inside
/// string fields. The upstream client normalizes them by serializing the
/// structure to JSON text, deleting every literal `\r\n` escape sequence,
/// and parsing the text back. That exact behavior is reproduced here so the
/// two clients observe identical payloads.
///
/// Scalars pass through untouched; structured values containing no such
/// sequences round-trip unchanged.
pub fn strip_crlf_escapes(value: Value) -> Result<Value> {
    if !(value.is_object() || value.is_array()) {
        return Ok(value);
    }
    let text = serde_json::to_string(&value)?;
    let stripped = text.replace("\\r\\n", "");
    Ok(serde_json::from_str(&stripped)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identity_for_clean_data() {
        let value = json!({
            "uid": 268158652,
            "nick": "someone",
            "nested": {"list": [1, 2, 3], "flag": true},
        });
        assert_eq!(strip_crlf_escapes(value.clone()).unwrap(), value);
    }

    #[test]
    fn strips_crlf_from_string_fields() {
        let value = json!({"chat": "first\r\nsecond"});
        assert_eq!(
            strip_crlf_escapes(value).unwrap(),
            json!({"chat": "firstsecond"})
        );
    }

    #[test]
    fn strips_crlf_inside_arrays() {
        let value = json!(["a\r\nb", "c"]);
        assert_eq!(strip_crlf_escapes(value).unwrap(), json!(["ab", "c"]));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(
            strip_crlf_escapes(json!("raw\r\nstring")).unwrap(),
            json!("raw\r\nstring")
        );
        assert_eq!(strip_crlf_escapes(json!(42)).unwrap(), json!(42));
        assert_eq!(strip_crlf_escapes(Value::Null).unwrap(), Value::Null);
    }
}
