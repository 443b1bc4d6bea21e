use crate::error::{ApiError, record};
use crate::transport::{ApiRequest, Transport};
use chrono::NaiveDate;
use desidia_schema::{Notification, NotificationPage, UnreadCount};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Paged notification inbox with a server-backed unread counter.
pub struct NotificationStore {
    transport: Arc<Transport>,
    notifications: Vec<Notification>,
    unread_count: u64,
    page: u32,
    limit: u32,
    total: u64,
    is_loading: bool,
    error: Option<String>,
}

impl NotificationStore {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            notifications: Vec::new(),
            unread_count: 0,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            total: 0,
            is_loading: false,
            error: None,
        }
    }

    fn page_request(&self, page: u32) -> ApiRequest {
        ApiRequest::get("/notifications")
            .query("page", page)
            .query("limit", self.limit)
    }

    /// Load the current page, replacing the list and the unread counter.
    pub async fn fetch_notifications(&mut self) -> Result<&[Notification], ApiError> {
        self.is_loading = true;
        self.error = None;
        let req = self.page_request(self.page);
        let result = self.transport.send_as::<NotificationPage>(&req).await;
        self.is_loading = false;

        let page = record(&mut self.error, result)?;
        self.notifications = page.notifications;
        self.unread_count = page.unread_count;
        self.total = page.total;
        Ok(&self.notifications)
    }

    pub async fn fetch_unread_count(&mut self) -> Result<u64, ApiError> {
        let result = self
            .transport
            .get::<UnreadCount>("/notifications/unread-count")
            .await;
        self.unread_count = record(&mut self.error, result)?.count;
        Ok(self.unread_count)
    }

    /// The counter only drops when the notification was known to be unread.
    pub async fn mark_as_read(&mut self, id: &str) -> Result<(), ApiError> {
        let result = self
            .transport
            .send_unit(&ApiRequest::patch(format!("/notifications/{id}/read")))
            .await;
        record(&mut self.error, result)?;

        if let Some(n) = self.notifications.iter_mut().find(|n| n.id == id)
            && !n.is_read
        {
            n.is_read = true;
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        Ok(())
    }

    pub async fn mark_all_as_read(&mut self) -> Result<(), ApiError> {
        let result = self
            .transport
            .send_unit(&ApiRequest::post("/notifications/mark-all-read"))
            .await;
        record(&mut self.error, result)?;

        for n in &mut self.notifications {
            n.is_read = true;
        }
        self.unread_count = 0;
        Ok(())
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        let result = self.transport.delete(&format!("/notifications/{id}")).await;
        record(&mut self.error, result)?;

        if self.notifications.iter().any(|n| n.id == id && !n.is_read) {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        self.notifications.retain(|n| n.id != id);
        Ok(())
    }

    /// Insert a locally received notification at the top.
    pub fn add_notification(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
        self.unread_count += 1;
    }

    /// Fetch the next page and append it. The page cursor only advances when
    /// the fetch succeeds.
    pub async fn load_more(&mut self) -> Result<usize, ApiError> {
        let next = self.page + 1;
        let req = self.page_request(next);
        let result = self.transport.send_as::<NotificationPage>(&req).await;
        let page = record(&mut self.error, result)?;

        self.page = next;
        self.total = page.total;
        let appended = page.notifications.len();
        self.notifications.extend(page.notifications);
        debug!(page = next, appended, "Loaded more notifications");
        Ok(appended)
    }

    pub fn has_more(&self) -> bool {
        (self.notifications.len() as u64) < self.total
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
        self.page = 1;
        self.total = 0;
        self.error = None;
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> u64 {
        self.unread_count
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub fn unread(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| !n.is_read).collect()
    }

    pub fn read(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| n.is_read).collect()
    }

    /// Grouped by UTC calendar day in first-seen order; undated entries share
    /// the `None` group.
    pub fn by_date(&self) -> Vec<(Option<NaiveDate>, Vec<&Notification>)> {
        let mut groups: Vec<(Option<NaiveDate>, Vec<&Notification>)> = Vec::new();
        for n in &self.notifications {
            let day = n.created_at.map(|at| at.date_naive());
            match groups.iter_mut().find(|(d, _)| *d == day) {
                Some((_, items)) => items.push(n),
                None => groups.push((day, vec![n])),
            }
        }
        groups
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::{TimeZone, Utc};
    use url::Url;

    fn store() -> NotificationStore {
        let transport = Transport::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost/api").expect("base url"),
            Arc::new(MemoryStore::new()),
        )
        .expect("transport");
        NotificationStore::new(Arc::new(transport))
    }

    fn notification(id: &str, day: u32) -> Notification {
        Notification {
            id: id.to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()),
            ..Notification::default()
        }
    }

    #[test]
    fn add_notification_goes_first_and_counts_as_unread() {
        let mut s = store();
        s.add_notification(notification("a", 1));
        s.add_notification(notification("b", 2));

        assert_eq!(s.notifications()[0].id, "b");
        assert_eq!(s.unread_count(), 2);
        assert!(s.has_unread());
    }

    #[test]
    fn by_date_keeps_first_seen_order() {
        let mut s = store();
        s.add_notification(notification("old", 1));
        s.add_notification(notification("new-1", 2));
        s.add_notification(notification("new-2", 2));

        let groups = s.by_date();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1[0].id, "old");
    }
}
