use serde::Serialize;
use tracing::{Level, debug};

/// Emit `value` as pretty JSON at DEBUG, tagged with `label`. Nothing is
/// serialized unless DEBUG is enabled.
pub fn debug_json<T: Serialize + ?Sized>(label: &str, value: &T) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(json) => debug!(label, "\n{json}"),
        Err(error) => debug!(label, %error, "Value is not representable as JSON"),
    }
}
