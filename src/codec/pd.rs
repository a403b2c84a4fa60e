// src/codec/pd.rs

use std::fmt::Write as _;

use crate::network::message::Payload;

/// Serialize a payload as space separated `key=value` tokens, in insertion order.
/// Nested maps are stringified; the result keeps a trailing space when non-empty.
pub fn encode_pd(data: &Payload) -> String {
    let mut out = String::new();
    for (key, value) in data {
        let _ = write!(out, "{}={} ", key, value);
    }
    out
}

/// Parse `key=value` tokens back into a payload. Values stay strings; tokens without `=`
/// are ignored.
pub fn decode_pd(text: &str) -> Payload {
    text.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
