//! The single HTTP entry point used by every store.
//!
//! - `request.rs`: immutable, replayable request descriptions
//! - `core.rs`: header injection, error normalization, refresh-and-replay

mod core;
mod request;

pub use core::{AuthEvent, TokenPair, Transport, WORKSPACE_HEADER};
pub use request::ApiRequest;
