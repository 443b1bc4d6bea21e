use super::{EntityCache, FanOut};
use crate::error::{ApiError, record};
use crate::transport::{ApiRequest, Transport};
use desidia_schema::{ListResponse, Project, ProjectStats, ProjectStatus, WorkspaceMember};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Optional filters for `GET /workspaces/:id/projects`.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

impl ProjectQuery {
    fn apply(&self, req: ApiRequest) -> ApiRequest {
        req.query_opt("status", self.status.map(ProjectStatus::as_str))
            .query_opt("search", self.search.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Projects of one workspace. The workspace id is passed into every call.
pub struct ProjectStore {
    transport: Arc<Transport>,
    cache: EntityCache<Project>,
    members: Vec<WorkspaceMember>,
    stats: Option<ProjectStats>,
    is_loading: bool,
    error: Option<String>,
}

fn base(workspace_id: &str) -> String {
    format!("/workspaces/{workspace_id}/projects")
}

fn item(workspace_id: &str, project_id: &str) -> String {
    format!("/workspaces/{workspace_id}/projects/{project_id}")
}

impl ProjectStore {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            cache: EntityCache::default(),
            members: Vec::new(),
            stats: None,
            is_loading: false,
            error: None,
        }
    }

    pub async fn fetch_projects(
        &mut self,
        workspace_id: &str,
        query: &ProjectQuery,
    ) -> Result<&[Project], ApiError> {
        self.begin();
        let req = query.apply(ApiRequest::get(base(workspace_id)));
        let result = self.transport.send_as::<ListResponse<Project>>(&req).await;
        self.is_loading = false;

        let projects = record(&mut self.error, result)?.into_items();
        self.cache.set_list(projects);
        Ok(self.cache.list())
    }

    /// Make `project_id` current, then load its members and stats together.
    pub(crate) async fn select(&mut self, workspace_id: &str, project_id: &str) -> Result<Project, ApiError> {
        self.begin();
        let result = self.select_inner(workspace_id, project_id).await;
        self.is_loading = false;
        record(&mut self.error, result)
    }

    async fn select_inner(&mut self, workspace_id: &str, project_id: &str) -> Result<Project, ApiError> {
        let project = match self.cache.find(project_id) {
            Some(cached) => cached.clone(),
            None => {
                self.transport
                    .get::<Project>(&item(workspace_id, project_id))
                    .await?
            }
        };
        self.cache.set_current(Some(project.clone()));
        info!(workspace_id, project_id, "Project selected");

        let members_path = format!("{}/members", item(workspace_id, project_id));
        let stats_path = format!("{}/stats", item(workspace_id, project_id));
        let (members, stats) = tokio::join!(
            self.transport
                .get::<ListResponse<WorkspaceMember>>(&members_path),
            self.transport.get::<ProjectStats>(&stats_path),
        );

        let mut fan = FanOut::default();
        if let Some(members) = fan.take(members) {
            self.members = members.into_items();
        }
        if let Some(stats) = fan.take(stats) {
            self.stats = Some(stats);
        }
        fan.finish()?;
        Ok(project)
    }

    pub async fn create<B: Serialize + ?Sized>(
        &mut self,
        workspace_id: &str,
        data: &B,
    ) -> Result<Project, ApiError> {
        self.begin();
        let result = self.transport.post::<_, Project>(&base(workspace_id), data).await;
        self.is_loading = false;

        let project = record(&mut self.error, result)?;
        self.cache.push(project.clone());
        Ok(project)
    }

    pub async fn update<B: Serialize + ?Sized>(
        &mut self,
        workspace_id: &str,
        project_id: &str,
        data: &B,
    ) -> Result<Project, ApiError> {
        self.begin();
        let result = self
            .transport
            .patch::<_, Project>(&item(workspace_id, project_id), data)
            .await;
        self.is_loading = false;

        let project = record(&mut self.error, result)?;
        self.cache.replace(&project);
        Ok(project)
    }

    /// Returns whether the deleted project was current. Nothing is
    /// auto-selected in its place.
    pub(crate) async fn delete(&mut self, workspace_id: &str, project_id: &str) -> Result<bool, ApiError> {
        self.begin();
        let result = self.transport.delete(&item(workspace_id, project_id)).await;
        self.is_loading = false;
        record(&mut self.error, result)?;

        let was_current = self.cache.remove(project_id);
        if was_current {
            self.members.clear();
            self.stats = None;
        }
        Ok(was_current)
    }

    pub async fn archive(&mut self, workspace_id: &str, project_id: &str) -> Result<Project, ApiError> {
        self.post_and_replace(workspace_id, project_id, "archive").await
    }

    pub async fn restore(&mut self, workspace_id: &str, project_id: &str) -> Result<Project, ApiError> {
        self.post_and_replace(workspace_id, project_id, "restore").await
    }

    async fn post_and_replace(
        &mut self,
        workspace_id: &str,
        project_id: &str,
        action: &str,
    ) -> Result<Project, ApiError> {
        self.error = None;
        let req = ApiRequest::post(format!("{}/{action}", item(workspace_id, project_id)));
        let result = self.transport.send_as::<Project>(&req).await;
        let project = record(&mut self.error, result)?;
        self.cache.replace(&project);
        Ok(project)
    }

    /// The copy is appended to the list.
    pub async fn duplicate<B: Serialize + ?Sized>(
        &mut self,
        workspace_id: &str,
        project_id: &str,
        data: &B,
    ) -> Result<Project, ApiError> {
        self.error = None;
        let result = self
            .transport
            .post::<_, Project>(&format!("{}/duplicate", item(workspace_id, project_id)), data)
            .await;
        let project = record(&mut self.error, result)?;
        self.cache.push(project.clone());
        Ok(project)
    }

    pub async fn fetch_members(
        &mut self,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<&[WorkspaceMember], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<WorkspaceMember>>(&format!("{}/members", item(workspace_id, project_id)))
            .await;
        self.members = record(&mut self.error, result)?.into_items();
        Ok(&self.members)
    }

    /// Add a member, reloading the member list when the project is current.
    pub async fn add_member(
        &mut self,
        workspace_id: &str,
        project_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let req = ApiRequest::post(format!("{}/members", item(workspace_id, project_id)))
            .body(json!({ "userId": user_id }));
        let result = self.transport.send_unit(&req).await;
        record(&mut self.error, result)?;

        self.cache.modify(project_id, |p| {
            if !p.members.iter().any(|m| m == user_id) {
                p.members.push(user_id.to_string());
            }
        });
        if self.cache.is_current(project_id) {
            self.fetch_members(workspace_id, project_id).await?;
        }
        Ok(())
    }

    pub async fn remove_member(
        &mut self,
        workspace_id: &str,
        project_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let result = self
            .transport
            .delete(&format!("{}/members/{user_id}", item(workspace_id, project_id)))
            .await;
        record(&mut self.error, result)?;

        self.cache
            .modify(project_id, |p| p.members.retain(|m| m != user_id));
        if self.cache.is_current(project_id) {
            self.members.retain(|m| m.user_id != user_id);
        }
        Ok(())
    }

    pub async fn fetch_stats(
        &mut self,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<&ProjectStats, ApiError> {
        let result = self
            .transport
            .get::<ProjectStats>(&format!("{}/stats", item(workspace_id, project_id)))
            .await;
        let stats = record(&mut self.error, result)?;
        Ok(self.stats.insert(stats))
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
        self.members.clear();
        self.stats = None;
        self.error = None;
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn list(&self) -> &[Project] {
        self.cache.list()
    }

    pub fn current(&self) -> Option<&Project> {
        self.cache.current()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.cache.current_id()
    }

    pub fn current_name(&self) -> &str {
        self.cache.current().map_or("", |p| p.name.as_str())
    }

    pub fn count(&self) -> usize {
        self.cache.len()
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.cache.find(id)
    }

    pub fn members(&self) -> &[WorkspaceMember] {
        &self.members
    }

    pub fn stats(&self) -> Option<&ProjectStats> {
        self.stats.as_ref()
    }

    pub fn active_projects(&self) -> Vec<&Project> {
        self.with_status(ProjectStatus::Active)
    }

    pub fn archived_projects(&self) -> Vec<&Project> {
        self.with_status(ProjectStatus::Archived)
    }

    fn with_status(&self, status: ProjectStatus) -> Vec<&Project> {
        self.cache.list().iter().filter(|p| p.status == status).collect()
    }

    pub fn projects_by_status(&self) -> BTreeMap<ProjectStatus, Vec<&Project>> {
        let mut grouped: BTreeMap<ProjectStatus, Vec<&Project>> = BTreeMap::new();
        for project in self.cache.list() {
            grouped.entry(project.status).or_default().push(project);
        }
        grouped
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
