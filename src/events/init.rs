use crate::config::LoggingConfig;
use crate::events::dispatcher::init_events;
use crate::events::sink::{ConsoleSink, JsonFileSink, LogSink};
use std::sync::Arc;

const DEFAULT_JSON_PATH: &str = "logs/oocsi_events.jsonl";
const DEFAULT_JSON_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_JSON_ROTATE: u32 = 3;
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Initialize events with defaults (console + JSON lines file)
pub async fn init_default_events() {
    init_events_from_config(None).await
}

/// Initialize events from the optional `[logging]` table
pub async fn init_events_from_config(logging: Option<&LoggingConfig>) {
    let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();

    let disable_console = logging.and_then(|l| l.disable_console).unwrap_or(false);
    if !disable_console {
        sinks.push(Arc::new(ConsoleSink::new(
            logging.and_then(|l| l.console_level),
        )));
    }

    if !logging.and_then(|l| l.disable_json).unwrap_or(false) {
        let json_path = logging
            .and_then(|l| l.json_path.clone())
            .unwrap_or_else(|| DEFAULT_JSON_PATH.into());
        let max_bytes = logging
            .and_then(|l| l.json_max_bytes)
            .unwrap_or(DEFAULT_JSON_MAX_BYTES);
        let rotate = logging
            .and_then(|l| l.json_rotate)
            .unwrap_or(DEFAULT_JSON_ROTATE);
        if let Ok(json_sink) = JsonFileSink::new(&json_path, true, max_bytes as u64, rotate).await {
            sinks.push(Arc::new(json_sink));
        }
    }
    init_events(sinks, EVENT_QUEUE_CAPACITY).await;
}
