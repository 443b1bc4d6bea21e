use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::workspace::ViewType;

const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";
const DEFAULT_PROJECT_ICON: &str = "📁";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    pub default_view: ViewType,
    pub show_completed_tasks: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            default_view: ViewType::List,
            show_completed_tasks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: String,
    pub workspace_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub name: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub description: String,
    #[serde(deserialize_with = "project_color")]
    pub color: String,
    #[serde(deserialize_with = "project_icon")]
    pub icon: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub status: ProjectStatus,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub members: Vec<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub settings: ProjectSettings,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: String::new(),
            workspace_id: None,
            name: String::new(),
            description: String::new(),
            color: DEFAULT_PROJECT_COLOR.to_string(),
            icon: DEFAULT_PROJECT_ICON.to_string(),
            status: ProjectStatus::Active,
            start_date: None,
            due_date: None,
            created_by: None,
            members: Vec::new(),
            settings: ProjectSettings::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Aggregate counters for one project, as reported by the stats endpoint.
///
/// The server decides which counters it reports; anything beyond the common
/// ones is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

fn project_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    crate::de::string_or(deserializer, DEFAULT_PROJECT_COLOR)
}

fn project_icon<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    crate::de::string_or(deserializer, DEFAULT_PROJECT_ICON)
}
