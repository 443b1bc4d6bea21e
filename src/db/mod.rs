//! Durable key-value storage for session state.
//!
//! Layout:
//! - `traits.rs`: the `KeyValueStore` seam used by the transport
//! - `actor.rs`: SQLite-backed store owned by a ractor actor
//! - `memory.rs`: in-process store for tests and throwaway sessions
//! - `schema.rs`: SQL DDL for initializing the database

pub mod actor;
pub mod memory;
pub mod schema;
pub mod traits;

pub use actor::{DbActorHandle, spawn};
pub use memory::MemoryStore;
pub use schema::SQLITE_INIT;
pub use traits::KeyValueStore;

/// Well-known keys for persisted client state.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const CURRENT_WORKSPACE_ID: &str = "currentWorkspaceId";
}
