use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::user::{User, UserRole};

const DEFAULT_WORKSPACE_ICON: &str = "🏢";
const DEFAULT_WORKSPACE_COLOR: &str = "#8b5cf6";
const DEFAULT_TAG_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    List,
    Kanban,
    Calendar,
    Timeline,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceSettings {
    pub default_view: ViewType,
    pub allow_guest_access: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceMember {
    #[serde(deserialize_with = "crate::de::null_default")]
    pub user_id: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub role: UserRole,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub joined_at: Option<DateTime<Utc>>,
    /// Expanded user record, when the server embeds it.
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workspace {
    pub id: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub name: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub slug: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub description: String,
    #[serde(deserialize_with = "workspace_icon")]
    pub icon: String,
    #[serde(deserialize_with = "workspace_color")]
    pub color: String,
    pub owner_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub members: Vec<WorkspaceMember>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub settings: WorkspaceSettings,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            icon: DEFAULT_WORKSPACE_ICON.to_string(),
            color: DEFAULT_WORKSPACE_COLOR.to_string(),
            owner_id: None,
            members: Vec::new(),
            settings: WorkspaceSettings::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub id: String,
    pub workspace_id: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub name: String,
    #[serde(deserialize_with = "tag_color")]
    pub color: String,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for Tag {
    fn default() -> Self {
        Self {
            id: String::new(),
            workspace_id: None,
            name: String::new(),
            color: DEFAULT_TAG_COLOR.to_string(),
            created_at: None,
        }
    }
}

fn workspace_icon<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    crate::de::string_or(deserializer, DEFAULT_WORKSPACE_ICON)
}

fn workspace_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    crate::de::string_or(deserializer, DEFAULT_WORKSPACE_COLOR)
}

fn tag_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    crate::de::string_or(deserializer, DEFAULT_TAG_COLOR)
}
