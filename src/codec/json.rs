// src/codec/json.rs

use serde_json::Value as JsonValue;

use crate::network::message::Payload;

/// Serialize a payload as a single-line JSON object with `timestamp` and `sender`
/// merged in as top-level fields.
pub fn encode_json(data: &Payload, timestamp_ms: i64, sender: &str) -> String {
    let mut object = data.to_json_object();
    object.insert("timestamp".into(), JsonValue::from(timestamp_ms));
    object.insert("sender".into(), JsonValue::String(sender.to_string()));
    JsonValue::Object(object).to_string()
}
