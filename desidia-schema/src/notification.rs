use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,
    #[default]
    TaskUpdated,
    TaskCompleted,
    CommentAdded,
    Mention,
    DueDateReminder,
    ProjectInvite,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    pub id: String,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    #[serde(deserialize_with = "crate::de::null_default")]
    pub kind: NotificationType,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub title: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub message: String,
    pub link: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub is_read: bool,
    pub metadata: Value,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UnreadCount {
    pub count: u64,
}
