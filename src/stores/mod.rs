//! Entity stores for the workspace → project → task hierarchy.
//!
//! Each store owns a list plus an optional "current" entity and mutates them
//! only after the server confirms. Cross-store cascades live in
//! [`crate::context::Desidia`].

mod cache;
pub mod notification;
pub mod project;
pub mod task;
pub mod workspace;

pub use cache::EntityCache;
pub use notification::NotificationStore;
pub use project::{ProjectQuery, ProjectStore};
pub use task::TaskStore;
pub use workspace::WorkspaceStore;

use crate::error::ApiError;

/// Collects the outcome of concurrently issued fetches. Every success is
/// applied; the first failure is reported once all have been seen.
#[derive(Debug, Default)]
pub(crate) struct FanOut {
    first_error: Option<ApiError>,
}

impl FanOut {
    pub(crate) fn take<T>(&mut self, result: Result<T, ApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.first_error.get_or_insert(err);
                None
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), ApiError> {
        self.first_error.map_or(Ok(()), Err)
    }
}
