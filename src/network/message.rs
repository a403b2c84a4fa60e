// src/network/message.rs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Dynamically typed payload value. Restricted to what every dialect can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Map(Payload),
}

impl Value {
    /// Convert an arbitrary JSON value. Kinds without a payload counterpart are
    /// stringified: `null` becomes `"null"`, arrays become their compact JSON text,
    /// integers beyond `i64` keep their exact decimal text.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::String("null".into()),
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if n.is_u64() {
                    Value::String(n.to_string())
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(_) => Value::String(value.to_string()),
            JsonValue::Object(map) => Value::Map(Payload::from_json_object(map)),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Integer(i) => JsonValue::from(*i),
            // JSON has no NaN/inf
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.to_string())),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Map(p) => JsonValue::Object(p.to_json_object()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Map(p) => write!(f, "{}", JsonValue::Object(p.to_json_object())),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Payload> for Value {
    fn from(p: Payload) -> Self {
        Value::Map(p)
    }
}

/// Structured key/value data of a message. Keeps insertion order; keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(IndexMap<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert or replace a key; replacing keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn from_json_object(map: serde_json::Map<String, JsonValue>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()
    }

    pub fn to_json_object(&self) -> serde_json::Map<String, JsonValue> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Parse JSON text that must hold an object.
    pub fn from_json_text(text: &str) -> Option<Self> {
        match serde_json::from_str::<JsonValue>(text).ok()? {
            JsonValue::Object(map) => Some(Self::from_json_object(map)),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A broker event on its way to one peer.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub data: Payload,
    pub timestamp: SystemTime,
}

impl Message {
    pub fn new(sender: &str, recipient: &str, data: Payload) -> Self {
        Self::with_timestamp(sender, recipient, data, SystemTime::now())
    }

    pub fn with_timestamp(sender: &str, recipient: &str, data: Payload, timestamp: SystemTime) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            data,
            timestamp,
        }
    }

    /// Construct with an epoch-millis timestamp (as carried on the wire).
    pub fn at_millis(sender: &str, recipient: &str, data: Payload, millis: i64) -> Self {
        Self::with_timestamp(sender, recipient, data, millis_to_system_time(millis))
    }

    pub fn timestamp_millis(&self) -> i64 {
        system_time_millis(self.timestamp)
    }

    /// Annotate the message data (audit only; the wire line is produced before this).
    pub fn add_data(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key, value);
    }
}

pub fn system_time_millis(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

pub fn millis_to_system_time(millis: i64) -> SystemTime {
    if millis >= 0 {
        UNIX_EPOCH + Duration::from_millis(millis as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(millis.unsigned_abs())
    }
}

pub fn now_millis() -> i64 {
    system_time_millis(SystemTime::now())
}
