use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::user::User;

/// One entry of a task's audit trail.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityLog {
    pub id: String,
    pub task_id: Option<String>,
    pub user_id: Option<String>,
    pub user: Option<User>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub action: String,
    /// Field-level diff as sent by the server; shape varies by action.
    pub changes: Value,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}
