mod api;
mod desidia;

pub use api::{ApiError, ErrorKind};
pub use desidia::DesidiaError;

/// Record a failed action's message on a store's `error` slot, then hand the
/// result back unchanged. A success clears nothing; callers reset the slot
/// when an action starts.
pub(crate) fn record<T>(slot: &mut Option<String>, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(err) = &result {
        *slot = Some(err.message.clone());
    }
    result
}
