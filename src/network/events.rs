use std::net::SocketAddr;

use crate::events::{
    dispatcher,
    model::{LogEvent, LogLevel, NetworkEvent},
};

/// Emit a structured network event. `allow_console = false` keeps it out of the console sink
/// (the JSON sink still records it).
pub(crate) fn emit_network_event(
    component: &'static str,
    level: LogLevel,
    action: &str,
    addr: Option<SocketAddr>,
    detail: Option<String>,
    allow_console: bool,
) {
    let mut meta = dispatcher::meta(component, level);
    meta.corr_id = Some(dispatcher::correlation_id());
    meta.suppress_console = !allow_console;
    dispatcher::emit(LogEvent::Network(NetworkEvent {
        meta,
        action: action.to_string(),
        addr: addr.map(|a| a.to_string()),
        detail,
    }));
}
