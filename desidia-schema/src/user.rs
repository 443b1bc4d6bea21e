use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a user inside the active workspace.
///
/// Declared from most to least privileged, so the derived ordering sorts
/// `Owner` first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Admin,
    #[default]
    Member,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Member => "member",
            UserRole::Guest => "guest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: String,
    pub notifications: bool,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub email: String,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub name: String,
    pub avatar: Option<String>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub role: UserRole,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::lenient_datetime")]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::de::null_default")]
    pub settings: UserSettings,
}
