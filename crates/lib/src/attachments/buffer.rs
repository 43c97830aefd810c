//! Byte-array marker rehydration for JSON attachment bodies.
//!
//! Binary data that went through a JSON serializer can come back as
//! `{"type":"Buffer","data":[137,80,78,71,...]}`. Writing that document verbatim would store
//! the textual form instead of the bytes, so markers are turned back into raw bytes first.

use serde_json::Value;

const BUFFER_MARKER: &str = "Buffer";

/// True only for the exact header value `application/json`. Variants with parameters or
/// different casing are written as received.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type == "application/json"
}

/// Decode a JSON body into the bytes that should be written to disk.
///
/// A document that is a marker, or an array made only of markers (nested arrays allowed),
/// becomes the concatenated marker bytes. Any other valid document is plain JSON and is kept
/// byte-for-byte. Invalid JSON is an error.
pub fn rehydrate(body: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let doc: Value = serde_json::from_slice(body)?;
    let mut out = Vec::new();
    if collect_binary(&doc, &mut out) {
        Ok(out)
    } else {
        Ok(body.to_vec())
    }
}

/// Append the bytes `value` encodes to `out`; false when `value` is not (entirely) binary.
fn collect_binary(value: &Value, out: &mut Vec<u8>) -> bool {
    if let Some(bytes) = marker_bytes(value) {
        out.extend_from_slice(&bytes);
        return true;
    }
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().all(|item| {
            matches!(item, Value::Object(_) | Value::Array(_)) && collect_binary(item, out)
        }),
        _ => false,
    }
}

fn marker_bytes(value: &Value) -> Option<Vec<u8>> {
    let obj = value.as_object()?;
    if obj.get("type").and_then(Value::as_str) != Some(BUFFER_MARKER) {
        return None;
    }
    obj.get("data")?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}
