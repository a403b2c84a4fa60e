//! Connection and message audit collaborator.
//!
//! Sessions report client lifecycle and delivered messages through [`EventLog`].
//! Implementations must be fire-and-forget: a failing sink never affects the connection.

use std::time::SystemTime;

use crate::events::{
    dispatcher,
    model::{ConnectionEvent, LogEvent, LogLevel, MessageEvent},
};
use crate::network::message::{system_time_millis, Payload};
use serde_json::Value as JsonValue;

pub trait EventLog: Send + Sync {
    fn log_connection(&self, token: &str, protocol: &str, event: &str, time: SystemTime);
    fn log_event(&self, sender: &str, recipient: &str, data: &Payload, time: SystemTime);
}

/// Forwards audit records into the global event dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DispatcherEventLog;

impl EventLog for DispatcherEventLog {
    fn log_connection(&self, token: &str, protocol: &str, event: &str, time: SystemTime) {
        dispatcher::emit(LogEvent::Connection(ConnectionEvent {
            meta: dispatcher::meta("connection", LogLevel::Info),
            token: token.to_string(),
            protocol: protocol.to_string(),
            event: event.to_string(),
            at_ms: system_time_millis(time),
        }));
    }

    fn log_event(&self, sender: &str, recipient: &str, data: &Payload, time: SystemTime) {
        dispatcher::emit(LogEvent::Message(MessageEvent {
            meta: dispatcher::meta("message", LogLevel::Debug),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            data: JsonValue::Object(data.to_json_object()),
            at_ms: system_time_millis(time),
        }));
    }
}
