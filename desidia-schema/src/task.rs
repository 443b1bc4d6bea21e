use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::User;
use crate::workspace::Tag;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    pub id: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub name: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub url: String,
    #[serde(rename = "type")]
    #[serde(deserialize_with = "crate::de::null_default")]
    pub mime_type: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub size: u64,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: String,
    pub project_id: Option<String>,
    pub parent_task_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub status: TaskStatus,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub priority: TaskPriority,
    pub assignee_id: Option<String>,
    pub assignee: Option<User>,
    pub reporter_id: Option<String>,
    pub reporter: Option<User>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub tags: Vec<Tag>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub attachments: Vec<Attachment>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub watchers: Vec<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub subtask_count: u32,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub completed_subtask_count: u32,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub comment_count: u32,
    /// Ascending sort key within the task's status column.
    #[serde(deserialize_with = "crate::de::null_default")]
    pub order: i64,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subtask {
    pub id: String,
    pub task_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub title: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub is_completed: bool,
    pub assignee_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub order: i64,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: String,
    pub task_id: Option<String>,
    pub author_id: Option<String>,
    pub author: Option<User>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub content: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub mentions: Vec<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub attachments: Vec<Attachment>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub is_edited: bool,
}

/// Body of `POST /projects/:id/tasks/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub task_id: String,
    pub target_status: TaskStatus,
    pub new_order: i64,
}
