use serde::{Deserialize, Serialize};

use crate::notification::Notification;

/// A list endpoint response.
///
/// Some endpoints answer with a bare JSON array, others wrap the items in a
/// pagination envelope such as `{ "tasks": [...], "total": 10, "page": 1, "limit": 50 }`.
/// Both decode into this type so callers never branch on the shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Paged(Page<T>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page<T> {
    #[serde(alias = "tasks", alias = "data")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl<T> ListResponse<T> {
    /// Total item count reported by the server, when the response was paged.
    pub fn total(&self) -> Option<u64> {
        match self {
            ListResponse::Bare(_) => None,
            ListResponse::Paged(page) => page.total,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Paged(page) => page.items,
        }
    }

    pub fn into_parts(self) -> (Vec<T>, Option<u64>) {
        let total = self.total();
        (self.into_items(), total)
    }
}

/// Body of `GET /notifications`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: u64,
    pub unread_count: u64,
}
