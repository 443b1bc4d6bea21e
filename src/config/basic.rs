use serde::{Deserialize, Serialize};

/// Basic (process-level) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// SQLite URL for persisted session state (tokens, current workspace).
    /// TOML: `basic.database_url`. Default: `sqlite://desidia.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            database_url: default_database_url(),
        }
    }
}

/// Credentials for a non-interactive login.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginConfig {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_database_url() -> String {
    "sqlite://desidia.db".to_string()
}
