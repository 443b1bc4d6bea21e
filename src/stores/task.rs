use super::{EntityCache, FanOut};
use crate::error::{ApiError, record};
use crate::transport::{ApiRequest, Transport};
use crate::views::{self, StatusGroups, TaskFilter, TaskFilters};
use chrono::{DateTime, Utc};
use desidia_schema::{
    ActivityLog, Attachment, Comment, ListResponse, ReorderRequest, Subtask, Task, TaskInput,
    TaskPriority, TaskStatus,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Page cursor for task lists. `total` is whatever the server last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            total: 0,
        }
    }
}

/// Tasks of one project plus the detail state of the current task.
pub struct TaskStore {
    transport: Arc<Transport>,
    cache: EntityCache<Task>,
    subtasks: Vec<Subtask>,
    comments: Vec<Comment>,
    activity: Vec<ActivityLog>,
    attachments: Vec<Attachment>,
    my_tasks: Vec<Task>,
    filters: TaskFilters,
    pagination: Pagination,
    is_loading: bool,
    is_loading_task: bool,
    error: Option<String>,
}

impl TaskStore {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            cache: EntityCache::default(),
            subtasks: Vec::new(),
            comments: Vec::new(),
            activity: Vec::new(),
            attachments: Vec::new(),
            my_tasks: Vec::new(),
            filters: TaskFilters::default(),
            pagination: Pagination::default(),
            is_loading: false,
            is_loading_task: false,
            error: None,
        }
    }

    /// `GET /projects/:id/tasks` with the current page, limit and filters.
    /// `extra` pairs are appended after them.
    pub async fn fetch_tasks(
        &mut self,
        project_id: &str,
        extra: &[(&str, &str)],
    ) -> Result<&[Task], ApiError> {
        self.begin();
        let req = ApiRequest::get(format!("/projects/{project_id}/tasks"))
            .query("page", self.pagination.page)
            .query("limit", self.pagination.limit)
            .queries(self.filters.to_query())
            .queries(extra.iter().copied());
        let result = self.transport.send_as::<ListResponse<Task>>(&req).await;
        self.is_loading = false;

        let (tasks, total) = record(&mut self.error, result)?.into_parts();
        if let Some(total) = total {
            self.pagination.total = total;
        }
        debug!(project_id, count = tasks.len(), "Tasks fetched");
        self.cache.set_list(tasks);
        Ok(self.cache.list())
    }

    /// Always refetches the task, makes it current, then loads subtasks,
    /// comments and activity together.
    pub async fn fetch_task(&mut self, task_id: &str) -> Result<Task, ApiError> {
        self.is_loading_task = true;
        self.error = None;
        let result = self.fetch_task_inner(task_id).await;
        self.is_loading_task = false;
        record(&mut self.error, result)
    }

    /// Make a task current, reusing the listed copy when there is one. Its
    /// subtasks, comments and activity are always reloaded.
    pub async fn select(&mut self, task_id: &str) -> Result<Task, ApiError> {
        let Some(task) = self.cache.find(task_id).cloned() else {
            return self.fetch_task(task_id).await;
        };
        self.is_loading_task = true;
        self.error = None;
        let result = self.open(task).await;
        self.is_loading_task = false;
        record(&mut self.error, result)
    }

    async fn fetch_task_inner(&mut self, task_id: &str) -> Result<Task, ApiError> {
        let task = self.transport.get::<Task>(&format!("/tasks/{task_id}")).await?;
        self.open(task).await
    }

    async fn open(&mut self, task: Task) -> Result<Task, ApiError> {
        let task_id = task.id.as_str();
        self.cache.set_current(Some(task.clone()));
        info!(task_id, "Task selected");

        let subtasks_path = format!("/tasks/{task_id}/subtasks");
        let comments_path = format!("/tasks/{task_id}/comments");
        let activity_path = format!("/tasks/{task_id}/activity");
        let (subtasks, comments, activity) = tokio::join!(
            self.transport.get::<ListResponse<Subtask>>(&subtasks_path),
            self.transport.get::<ListResponse<Comment>>(&comments_path),
            self.transport
                .get::<ListResponse<ActivityLog>>(&activity_path),
        );

        let mut fan = FanOut::default();
        if let Some(subtasks) = fan.take(subtasks) {
            self.subtasks = subtasks.into_items();
        }
        if let Some(comments) = fan.take(comments) {
            self.comments = comments.into_items();
        }
        if let Some(activity) = fan.take(activity) {
            self.activity = activity.into_items();
        }
        fan.finish()?;
        Ok(task)
    }

    /// `POST /projects/:id/tasks`; the task is inserted at the front.
    pub async fn create<B: Serialize + ?Sized>(
        &mut self,
        project_id: &str,
        data: &B,
    ) -> Result<Task, ApiError> {
        self.begin();
        let result = self
            .transport
            .post::<_, Task>(&format!("/projects/{project_id}/tasks"), data)
            .await;
        self.is_loading = false;

        let task = record(&mut self.error, result)?;
        self.cache.push_front(task.clone());
        Ok(task)
    }

    pub async fn update<B: Serialize + ?Sized>(
        &mut self,
        task_id: &str,
        data: &B,
    ) -> Result<Task, ApiError> {
        self.error = None;
        let result = self
            .transport
            .patch::<_, Task>(&format!("/tasks/{task_id}"), data)
            .await;
        let task = record(&mut self.error, result)?;
        self.cache.replace(&task);
        Ok(task)
    }

    /// Returns whether the deleted task was current; its detail state is
    /// dropped with it.
    pub async fn delete(&mut self, task_id: &str) -> Result<bool, ApiError> {
        self.error = None;
        let result = self.transport.delete(&format!("/tasks/{task_id}")).await;
        record(&mut self.error, result)?;

        let was_current = self.cache.remove(task_id);
        if was_current {
            self.clear_detail();
        }
        Ok(was_current)
    }

    pub async fn change_status(&mut self, task_id: &str, status: TaskStatus) -> Result<Task, ApiError> {
        let patch = TaskInput {
            status: Some(status),
            ..TaskInput::default()
        };
        self.update(task_id, &patch).await
    }

    /// `None` unassigns the task.
    pub async fn change_assignee(
        &mut self,
        task_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<Task, ApiError> {
        self.update(task_id, &json!({ "assigneeId": assignee_id }))
            .await
    }

    /// Move a task to `target_status` at `new_order`.
    ///
    /// The local copy (list entry and current task) changes before the
    /// request is sent and is not rolled back if the server rejects it.
    pub async fn reorder(
        &mut self,
        project_id: &str,
        task_id: &str,
        target_status: TaskStatus,
        new_order: i64,
    ) -> Result<(), ApiError> {
        self.error = None;
        self.cache.modify(task_id, |t| {
            t.status = target_status;
            t.order = new_order;
        });

        let req = ApiRequest::post(format!("/projects/{project_id}/tasks/reorder")).json(
            &ReorderRequest {
                task_id: task_id.to_string(),
                target_status,
                new_order,
            },
        )?;
        let result = self.transport.send_unit(&req).await;
        if let Err(err) = &result {
            warn!(task_id, code = %err.code, "Reorder rejected; keeping local order");
        }
        record(&mut self.error, result)
    }

    /// `GET /tasks/my-tasks`, across every project.
    pub async fn fetch_my_tasks(&mut self, extra: &[(&str, &str)]) -> Result<&[Task], ApiError> {
        self.begin();
        let req = ApiRequest::get("/tasks/my-tasks").queries(extra.iter().copied());
        let result = self.transport.send_as::<ListResponse<Task>>(&req).await;
        self.is_loading = false;

        self.my_tasks = record(&mut self.error, result)?.into_items();
        Ok(&self.my_tasks)
    }

    /// `POST /tasks/bulk-update`. Tasks echoed back by the server replace
    /// their cached copies. An empty body changes nothing; a body that is
    /// neither a task list nor a task envelope is a decode error.
    pub async fn bulk_update<B: Serialize + ?Sized>(
        &mut self,
        task_ids: &[&str],
        data: &B,
    ) -> Result<usize, ApiError> {
        self.error = None;
        let mut body = serde_json::to_value(data).map_err(|e| ApiError::encode(&e))?;
        if let Value::Object(map) = &mut body {
            map.insert("taskIds".to_string(), json!(task_ids));
        } else {
            body = json!({ "taskIds": task_ids });
        }

        let result = self
            .transport
            .send(&ApiRequest::post("/tasks/bulk-update").body(body))
            .await;
        let value = record(&mut self.error, result)?;
        if value.is_null() {
            return Ok(0);
        }

        let decoded = serde_json::from_value::<ListResponse<Task>>(value).map_err(|e| {
            warn!(error = %e, "Bulk update answered with an unreadable body");
            ApiError::decode(&e)
        });
        let updated = record(&mut self.error, decoded)?.into_items();
        for task in &updated {
            self.cache.replace(task);
        }
        Ok(updated.len())
    }

    pub async fn bulk_delete(&mut self, task_ids: &[&str]) -> Result<(), ApiError> {
        self.error = None;
        let req = ApiRequest::post("/tasks/bulk-delete").body(json!({ "taskIds": task_ids }));
        let result = self.transport.send_unit(&req).await;
        record(&mut self.error, result)?;

        for id in task_ids {
            if self.cache.remove(id) {
                self.clear_detail();
            }
        }
        Ok(())
    }

    pub async fn fetch_subtasks(&mut self, task_id: &str) -> Result<&[Subtask], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<Subtask>>(&format!("/tasks/{task_id}/subtasks"))
            .await;
        self.subtasks = record(&mut self.error, result)?.into_items();
        Ok(&self.subtasks)
    }

    pub async fn add_subtask<B: Serialize + ?Sized>(
        &mut self,
        data: &B,
    ) -> Result<Option<Subtask>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .post::<_, Subtask>(&format!("/tasks/{task_id}/subtasks"), data)
            .await;
        let subtask = record(&mut self.error, result)?;
        self.subtasks.push(subtask.clone());
        Ok(Some(subtask))
    }

    pub async fn update_subtask<B: Serialize + ?Sized>(
        &mut self,
        subtask_id: &str,
        data: &B,
    ) -> Result<Option<Subtask>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .patch::<_, Subtask>(&format!("/tasks/{task_id}/subtasks/{subtask_id}"), data)
            .await;
        let subtask = record(&mut self.error, result)?;
        self.replace_subtask(&subtask);
        Ok(Some(subtask))
    }

    pub async fn toggle_subtask(&mut self, subtask_id: &str) -> Result<Option<Subtask>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let req = ApiRequest::post(format!("/tasks/{task_id}/subtasks/{subtask_id}/toggle"));
        let result = self.transport.send_as::<Subtask>(&req).await;
        let subtask = record(&mut self.error, result)?;
        self.replace_subtask(&subtask);
        Ok(Some(subtask))
    }

    pub async fn delete_subtask(&mut self, subtask_id: &str) -> Result<Option<()>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .delete(&format!("/tasks/{task_id}/subtasks/{subtask_id}"))
            .await;
        record(&mut self.error, result)?;
        self.subtasks.retain(|s| s.id != subtask_id);
        Ok(Some(()))
    }

    fn replace_subtask(&mut self, subtask: &Subtask) {
        if let Some(slot) = self.subtasks.iter_mut().find(|s| s.id == subtask.id) {
            *slot = subtask.clone();
        }
    }

    pub async fn fetch_comments(&mut self, task_id: &str) -> Result<&[Comment], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<Comment>>(&format!("/tasks/{task_id}/comments"))
            .await;
        self.comments = record(&mut self.error, result)?.into_items();
        Ok(&self.comments)
    }

    pub async fn add_comment(&mut self, content: &str) -> Result<Option<Comment>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .post::<_, Comment>(
                &format!("/tasks/{task_id}/comments"),
                &json!({ "content": content }),
            )
            .await;
        let comment = record(&mut self.error, result)?;
        self.comments.push(comment.clone());
        Ok(Some(comment))
    }

    pub async fn update_comment(
        &mut self,
        comment_id: &str,
        content: &str,
    ) -> Result<Option<Comment>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .patch::<_, Comment>(
                &format!("/tasks/{task_id}/comments/{comment_id}"),
                &json!({ "content": content }),
            )
            .await;
        let comment = record(&mut self.error, result)?;
        if let Some(slot) = self.comments.iter_mut().find(|c| c.id == comment.id) {
            *slot = comment.clone();
        }
        Ok(Some(comment))
    }

    pub async fn delete_comment(&mut self, comment_id: &str) -> Result<Option<()>, ApiError> {
        let Some(task_id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .delete(&format!("/tasks/{task_id}/comments/{comment_id}"))
            .await;
        record(&mut self.error, result)?;
        self.comments.retain(|c| c.id != comment_id);
        Ok(Some(()))
    }

    pub async fn fetch_activity(&mut self, task_id: &str) -> Result<&[ActivityLog], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<ActivityLog>>(&format!("/tasks/{task_id}/activity"))
            .await;
        self.activity = record(&mut self.error, result)?.into_items();
        Ok(&self.activity)
    }

    pub async fn fetch_attachments(&mut self, task_id: &str) -> Result<&[Attachment], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<Attachment>>(&format!("/tasks/{task_id}/attachments"))
            .await;
        self.attachments = record(&mut self.error, result)?.into_items();
        Ok(&self.attachments)
    }

    pub async fn delete_attachment(&mut self, task_id: &str, attachment_id: &str) -> Result<(), ApiError> {
        let result = self
            .transport
            .delete(&format!("/tasks/{task_id}/attachments/{attachment_id}"))
            .await;
        record(&mut self.error, result)?;

        self.attachments.retain(|a| a.id != attachment_id);
        self.cache
            .modify(task_id, |t| t.attachments.retain(|a| a.id != attachment_id));
        Ok(())
    }

    pub async fn add_watcher(&mut self, task_id: &str, user_id: &str) -> Result<(), ApiError> {
        let req = ApiRequest::post(format!("/tasks/{task_id}/watchers"))
            .body(json!({ "userId": user_id }));
        let result = self.transport.send_unit(&req).await;
        record(&mut self.error, result)?;

        self.cache.modify(task_id, |t| {
            if !t.watchers.iter().any(|w| w == user_id) {
                t.watchers.push(user_id.to_string());
            }
        });
        Ok(())
    }

    pub async fn remove_watcher(&mut self, task_id: &str, user_id: &str) -> Result<(), ApiError> {
        let result = self
            .transport
            .delete(&format!("/tasks/{task_id}/watchers/{user_id}"))
            .await;
        record(&mut self.error, result)?;

        self.cache
            .modify(task_id, |t| t.watchers.retain(|w| w != user_id));
        Ok(())
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filters.set(filter);
    }

    pub fn clear_filters(&mut self) {
        self.filters = TaskFilters::default();
    }

    pub fn set_page(&mut self, page: u32) {
        self.pagination.page = page.max(1);
    }

    /// Forget the current task and everything loaded for it.
    pub fn clear_current(&mut self) {
        self.cache.set_current(None);
        self.clear_detail();
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.clear_detail();
        self.my_tasks.clear();
        self.error = None;
        self.clear_filters();
        self.pagination = Pagination::default();
    }

    fn clear_detail(&mut self) {
        self.subtasks.clear();
        self.comments.clear();
        self.activity.clear();
        self.attachments.clear();
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn list(&self) -> &[Task] {
        self.cache.list()
    }

    pub fn current(&self) -> Option<&Task> {
        self.cache.current()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.cache.current_id()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.cache.find(id)
    }

    pub fn count(&self) -> usize {
        self.cache.len()
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn activity(&self) -> &[ActivityLog] {
        &self.activity
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn my_tasks(&self) -> &[Task] {
        &self.my_tasks
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn by_status(&self) -> StatusGroups<'_> {
        views::group_by_status(self.list())
    }

    pub fn by_priority(&self) -> BTreeMap<TaskPriority, Vec<&Task>> {
        views::group_by_priority(self.list())
    }

    pub fn by_assignee(&self) -> BTreeMap<&str, Vec<&Task>> {
        views::group_by_assignee(self.list())
    }

    pub fn completed(&self) -> Vec<&Task> {
        views::completed(self.list())
    }

    pub fn pending(&self) -> Vec<&Task> {
        views::pending(self.list())
    }

    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        views::overdue(self.list(), now)
    }

    pub fn filtered(&self) -> Vec<&Task> {
        views::filter_tasks(self.list(), &self.filters)
    }

    /// Progress of the current task; 0 when none is current.
    pub fn subtask_progress(&self) -> u32 {
        self.current()
            .map_or(0, |t| views::subtask_progress(t, &self.subtasks))
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_loading_task(&self) -> bool {
        self.is_loading_task
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
