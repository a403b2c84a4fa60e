//! Payload codec: translation between a message's structured data and each
//! dialect's wire text.
//!
//! * OOCSI: data → node graph → bincode → base64 token
//! * PD: data → `key=value` tokens
//! * JSON: data → object with `timestamp` and `sender` merged in

pub mod json;
pub mod oocsi;
pub mod pd;

pub use json::encode_json;
pub use oocsi::{decode_oocsi, encode_oocsi};
pub use pd::{decode_pd, encode_pd};

use thiserror::Error;

use crate::network::dialect::Dialect;
use crate::network::message::{now_millis, Message};

#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload token is not valid base64
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
    /// Decoded bytes do not form a valid payload graph
    #[error("malformed payload graph: {0}")]
    MalformedGraph(String),
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

/// Parse an epoch-millis timestamp. Malformed input yields the current time instead of an error.
pub fn parse_timestamp(text: &str) -> i64 {
    text.trim().parse::<i64>().unwrap_or_else(|_| now_millis())
}

/// Render the push line for a message in the given dialect (without dialect framing).
pub fn format_push_line(dialect: Dialect, message: &Message) -> Result<String, CodecError> {
    let timestamp = message.timestamp_millis();
    let line = match dialect {
        Dialect::Oocsi => format!(
            "send {} {} {} {}",
            message.recipient,
            encode_oocsi(&message.data)?,
            timestamp,
            message.sender
        ),
        Dialect::Pd => format!(
            "{} {}timestamp={} sender={}",
            message.recipient,
            encode_pd(&message.data),
            timestamp,
            message.sender
        ),
        Dialect::Json => encode_json(&message.data, timestamp, &message.sender),
    };
    Ok(line)
}
