//! SQL DDL for initializing the database schema.

/// SQLite schema includes:
/// - `kv_store` table (one row per persisted client-state key)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Persisted client state (tokens, current workspace)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL -- RFC3339
);
"#;
