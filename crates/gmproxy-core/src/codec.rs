//! JSON payload codec with raw fallback
//!
//! Argument lists and return values cross the wire as JSON text carried in a
//! string value. Anything that fails to encode or decode is passed through
//! untouched instead of failing the call, so peers that send raw values
//! still interoperate.

use crate::naming::CallId;
use serde_json::Value;

/// Encode a value as JSON text, falling back to the raw value
pub fn encode(value: &Value) -> Value {
    match serde_json::to_string(value) {
        Ok(text) => Value::String(text),
        Err(_) => value.clone(),
    }
}

/// Encode a positional argument list as one JSON unit
pub fn encode_args(args: &[Value]) -> Value {
    encode(&Value::Array(args.to_vec()))
}

/// Decode a received payload
///
/// - absent or empty payloads decode to `null`
/// - string payloads are parsed as JSON; malformed text is returned as the
///   raw string
/// - non-string payloads were never encoded and are returned as-is
pub fn decode(payload: Option<&Value>) -> Value {
    match payload {
        None => Value::Null,
        Some(Value::String(text)) if text.is_empty() => Value::Null,
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(raw) => raw.clone(),
    }
}

/// Decode a received argument list into positional arguments
///
/// A decoded array is spread positionally. Any other decoded value (including
/// a raw string that failed to parse) becomes the single argument.
pub fn decode_args(payload: Option<&Value>) -> Vec<Value> {
    match decode(payload) {
        Value::Null => Vec::new(),
        Value::Array(args) => args,
        single => vec![single],
    }
}

/// Read a call id off the wire; peers send it as a string or a number
pub fn call_id_from(value: &Value) -> Option<CallId> {
    match value {
        Value::String(id) if !id.is_empty() => Some(CallId::new(id.as_str())),
        Value::Number(id) => Some(CallId::new(number_id(id))),
        _ => None,
    }
}

/// Integral numbers print without a fraction, so `1.0` names the same
/// response event as `1`
fn number_id(id: &serde_json::Number) -> String {
    if let Some(n) = id.as_u64() {
        return n.to_string();
    }
    if let Some(n) = id.as_i64() {
        return n.to_string();
    }
    match id.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => (f as i64).to_string(),
        _ => id.to_string(),
    }
}

/// Largest integer a double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
