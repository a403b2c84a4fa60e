// src/client/handler.rs

use crate::codec::{decode_oocsi, parse_timestamp};
use crate::events::model::LogLevel;
use crate::network::events::emit_network_event;
use crate::network::message::Payload;

/// Receives decoded events pushed to a client.
pub trait Handler: Send + Sync {
    fn receive(&self, sender: &str, data: Payload, timestamp: i64, channel: &str, recipient: &str);
}

impl<F> Handler for F
where
    F: Fn(&str, Payload, i64, &str, &str) + Send + Sync,
{
    fn receive(&self, sender: &str, data: Payload, timestamp: i64, channel: &str, recipient: &str) {
        self(sender, data, timestamp, channel, recipient)
    }
}

/// Decode an OOCSI payload token and deliver it to `handler`.
///
/// A malformed timestamp falls back to the current time. A payload that does not decode
/// is logged and dropped; the return value tells whether the handler was called.
pub fn dispatch_send(
    handler: &dyn Handler,
    sender: &str,
    payload: &str,
    timestamp: &str,
    channel: &str,
    recipient: &str,
) -> bool {
    match decode_oocsi(payload) {
        Ok(data) => {
            handler.receive(sender, data, parse_timestamp(timestamp), channel, recipient);
            true
        }
        Err(e) => {
            emit_network_event(
                "client",
                LogLevel::Warn,
                "payload_decode_failed",
                None,
                Some(format!("sender={} channel={} error={}", sender, channel, e)),
                true,
            );
            false
        }
    }
}

/// A pushed OOCSI line: `send <recipient> <payload> <timestamp> <sender>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushLine {
    pub recipient: String,
    pub payload: String,
    pub timestamp: String,
    pub sender: String,
}

impl PushLine {
    /// `None` for anything that is not a five-field `send` line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        if fields.next()? != "send" {
            return None;
        }
        let push = Self {
            recipient: fields.next()?.to_string(),
            payload: fields.next()?.to_string(),
            timestamp: fields.next()?.to_string(),
            sender: fields.next()?.to_string(),
        };
        if fields.next().is_some() {
            return None;
        }
        Some(push)
    }

    /// Deliver to `handler` on behalf of the local client `own_token`.
    /// The line's recipient is reported as the channel.
    pub fn dispatch(&self, handler: &dyn Handler, own_token: &str) -> bool {
        dispatch_send(
            handler,
            &self.sender,
            &self.payload,
            &self.timestamp,
            &self.recipient,
            own_token,
        )
    }
}
