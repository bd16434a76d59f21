//! Structured events routed through the `log` facade.

/// Target of records that carry a serialized JSON event.
pub const JSON_TARGET: &str = "cdetect::json";

/// Emits `$value` (anything implementing `Display`, usually a
/// `serde_json::Value`) as a single JSON line on stdout.
#[macro_export]
macro_rules! log_json {
    ($value:expr) => {
        log::log!(target: $crate::logger::JSON_TARGET, log::Level::Info, "{}", $value)
    };
}

pub struct JsonEvent(pub String);

pub fn get_json_event(record: &log::Record) -> Option<JsonEvent> {
    if record.target() != JSON_TARGET {
        return None;
    }
    Some(JsonEvent(record.args().to_string()))
}
