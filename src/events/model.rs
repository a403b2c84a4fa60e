use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    pub ts: SystemTime,
    pub level: LogLevel,
    pub corr_id: Option<String>,
    pub session_id: String,
    pub component: &'static str,
    pub suppress_console: bool,
}

/// Low-level socket / session diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct NetworkEvent {
    pub meta: EventMeta,
    pub action: String,
    pub addr: Option<String>,
    pub detail: Option<String>,
}

/// Client lifecycle entry (connected / disconnected)
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionEvent {
    pub meta: EventMeta,
    pub token: String,
    pub protocol: String,
    pub event: String,
    pub at_ms: i64,
}

/// Audit record of a message delivered to a client
#[derive(Debug, Clone, Serialize)]
pub struct MessageEvent {
    pub meta: EventMeta,
    pub sender: String,
    pub recipient: String,
    pub data: JsonValue,
    pub at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvent {
    pub meta: EventMeta,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Network(NetworkEvent),
    Connection(ConnectionEvent),
    Message(MessageEvent),
    System(SystemEvent),
}
