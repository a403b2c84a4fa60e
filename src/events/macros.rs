/// Emit a `SystemEvent` with a fresh correlation id.
///
/// `emit_system_event!("config", LogLevel::Info, "config_loaded", Some(detail))`
#[macro_export]
macro_rules! emit_system_event {
    ($component:expr, $level:expr, $action:expr, $detail:expr) => {{
        use $crate::events::{dispatcher, model::*};
        let mut meta = dispatcher::meta($component, $level);
        meta.corr_id = Some(dispatcher::correlation_id());
        dispatcher::emit(LogEvent::System(SystemEvent {
            meta,
            action: $action.to_string(),
            detail: $detail,
        }));
    }};
}
