use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{EnvelopeError, Result};

/// Wire marker identifying protocol traffic.
pub const MARKER: &str = "amp-";

const SENTINEL_KEY: &str = "sentinel";
const TYPE_KEY: &str = "type";

/// A decoded `{ sentinel, type, ...payload }` object.
///
/// Decoding only guarantees that the body is a JSON object. Presence of
/// `sentinel` and `type` is checked by whoever consumes the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope with no payload fields.
    pub fn new(message_type: &str, sentinel: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(SENTINEL_KEY.to_string(), Value::from(sentinel));
        fields.insert(TYPE_KEY.to_string(), Value::from(message_type));
        Self { fields }
    }

    /// Wrap an already-parsed object.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The `sentinel` field, when present and a string.
    pub fn sentinel(&self) -> Option<&str> {
        self.fields.get(SENTINEL_KEY).and_then(Value::as_str)
    }

    /// The `type` field, when present and a string.
    pub fn message_type(&self) -> Option<&str> {
        self.fields.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Look up any field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, including `sentinel` and `type`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Deserialize the whole object into a typed view.
    pub fn payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    /// Consume the envelope into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Encode this envelope with the default marker.
    pub fn to_wire(&self) -> Result<String> {
        self.to_wire_with_marker(MARKER)
    }

    /// Encode this envelope with an explicit marker.
    pub fn to_wire_with_marker(&self, marker: &str) -> Result<String> {
        let body = serde_json::to_string(&self.fields)?;
        Ok(prefixed(marker, &body))
    }
}

/// Encode an envelope with the default marker.
///
/// `payload` must serialize to a JSON object, `null`, or unit. Its fields are
/// merged next to `sentinel` and `type`; the envelope keys always win.
pub fn encode_envelope<T: Serialize + ?Sized>(
    message_type: &str,
    sentinel: &str,
    payload: &T,
) -> Result<String> {
    encode_envelope_with_marker(MARKER, message_type, sentinel, payload)
}

/// Encode an envelope with an explicit marker.
///
/// `sentinel` and `type` are written after the payload fields, so a payload
/// carrying either key is overridden. Decoding such a message yields the
/// envelope's values, not the payload's.
pub fn encode_envelope_with_marker<T: Serialize + ?Sized>(
    marker: &str,
    message_type: &str,
    sentinel: &str,
    payload: &T,
) -> Result<String> {
    let mut fields = match serde_json::to_value(payload)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(EnvelopeError::PayloadNotObject {
                kind: value_kind(&other),
            })
        }
    };
    fields.insert(SENTINEL_KEY.to_string(), Value::from(sentinel));
    fields.insert(TYPE_KEY.to_string(), Value::from(message_type));

    Envelope::from_fields(fields).to_wire_with_marker(marker)
}

/// Decode a wire string using the default marker.
pub fn decode_envelope(wire: &str) -> Option<Envelope> {
    decode_envelope_with_marker(MARKER, wire)
}

/// Decode a wire string using an explicit marker.
///
/// Returns `None` when the marker is missing, the remainder is not JSON, or
/// the JSON is not an object. Never panics.
pub fn decode_envelope_with_marker(marker: &str, wire: &str) -> Option<Envelope> {
    let body = wire.strip_prefix(marker)?;
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Some(Envelope { fields }),
        Ok(_) | Err(_) => None,
    }
}

/// Whether `wire` starts with `marker`.
pub fn has_marker(wire: &str, marker: &str) -> bool {
    wire.starts_with(marker)
}

fn prefixed(marker: &str, body: &str) -> String {
    let mut wire = String::with_capacity(marker.len() + body.len());
    wire.push_str(marker);
    wire.push_str(body);
    wire
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
