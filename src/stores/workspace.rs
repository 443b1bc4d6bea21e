use super::{EntityCache, FanOut};
use crate::error::{ApiError, record};
use crate::transport::{ApiRequest, Transport};
use desidia_schema::{ListResponse, MemberInvite, Tag, UserRole, Workspace, WorkspaceMember};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Workspaces visible to the user, the selected one, and its members and tags.
pub struct WorkspaceStore {
    transport: Arc<Transport>,
    cache: EntityCache<Workspace>,
    members: Vec<WorkspaceMember>,
    tags: Vec<Tag>,
    is_loading: bool,
    error: Option<String>,
}

impl WorkspaceStore {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            cache: EntityCache::default(),
            members: Vec::new(),
            tags: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    /// `GET /workspaces`. Selection of a default is left to the caller.
    pub async fn fetch_workspaces(&mut self) -> Result<&[Workspace], ApiError> {
        self.begin();
        let result = self
            .transport
            .get::<ListResponse<Workspace>>("/workspaces")
            .await;
        self.is_loading = false;

        let workspaces = record(&mut self.error, result)?.into_items();
        debug!(count = workspaces.len(), "Workspaces fetched");
        self.cache.set_list(workspaces);
        Ok(self.cache.list())
    }

    /// Make `id` current: resolve it from the list or the server, scope the
    /// transport to it, then load members and tags together.
    pub(crate) async fn select(&mut self, id: &str) -> Result<Workspace, ApiError> {
        self.begin();
        let result = self.select_inner(id).await;
        self.is_loading = false;
        record(&mut self.error, result)
    }

    async fn select_inner(&mut self, id: &str) -> Result<Workspace, ApiError> {
        let workspace = match self.cache.find(id) {
            Some(cached) => cached.clone(),
            None => {
                self.transport
                    .get::<Workspace>(&format!("/workspaces/{id}"))
                    .await?
            }
        };

        self.cache.set_current(Some(workspace.clone()));
        self.transport.set_workspace_scope(Some(id)).await;
        info!(workspace_id = %id, name = %workspace.name, "Workspace selected");

        let members_path = format!("/workspaces/{id}/members");
        let tags_path = format!("/workspaces/{id}/tags");
        let (members, tags) = tokio::join!(
            self.transport
                .get::<ListResponse<WorkspaceMember>>(&members_path),
            self.transport.get::<ListResponse<Tag>>(&tags_path),
        );

        let mut fan = FanOut::default();
        if let Some(members) = fan.take(members) {
            self.members = members.into_items();
        }
        if let Some(tags) = fan.take(tags) {
            self.tags = tags.into_items();
        }
        fan.finish()?;
        Ok(workspace)
    }

    /// `POST /workspaces`; the new workspace is appended but not selected.
    pub async fn create<B: Serialize + ?Sized>(&mut self, data: &B) -> Result<Workspace, ApiError> {
        self.begin();
        let result = self.transport.post::<_, Workspace>("/workspaces", data).await;
        self.is_loading = false;

        let workspace = record(&mut self.error, result)?;
        self.cache.push(workspace.clone());
        Ok(workspace)
    }

    pub async fn update<B: Serialize + ?Sized>(
        &mut self,
        id: &str,
        data: &B,
    ) -> Result<Workspace, ApiError> {
        self.begin();
        let result = self
            .transport
            .patch::<_, Workspace>(&format!("/workspaces/{id}"), data)
            .await;
        self.is_loading = false;

        let workspace = record(&mut self.error, result)?;
        self.cache.replace(&workspace);
        Ok(workspace)
    }

    /// Update the current workspace. `Ok(None)` when nothing is selected.
    pub async fn update_current<B: Serialize + ?Sized>(
        &mut self,
        data: &B,
    ) -> Result<Option<Workspace>, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        self.update(&id, data).await.map(Some)
    }

    /// `DELETE /workspaces/:id`. Returns whether the deleted workspace was
    /// current; in that case its members, tags and the transport scope are
    /// dropped as well.
    pub(crate) async fn delete(&mut self, id: &str) -> Result<bool, ApiError> {
        self.begin();
        let result = self.transport.delete(&format!("/workspaces/{id}")).await;
        self.is_loading = false;
        record(&mut self.error, result)?;

        let was_current = self.cache.remove(id);
        if was_current {
            self.members.clear();
            self.tags.clear();
            self.transport.set_workspace_scope(None).await;
        }
        Ok(was_current)
    }

    pub async fn fetch_members(&mut self, workspace_id: &str) -> Result<&[WorkspaceMember], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<WorkspaceMember>>(&format!("/workspaces/{workspace_id}/members"))
            .await;
        self.members = record(&mut self.error, result)?.into_items();
        Ok(&self.members)
    }

    /// Invite into the current workspace, then reload its members.
    pub async fn invite_member(&mut self, invite: &MemberInvite) -> Result<bool, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(false);
        };
        let result = self
            .transport
            .send_unit(&ApiRequest::post(format!("/workspaces/{id}/members/invite")).json(invite)?)
            .await;
        record(&mut self.error, result)?;
        self.fetch_members(&id).await?;
        Ok(true)
    }

    pub async fn update_member_role(
        &mut self,
        user_id: &str,
        role: UserRole,
    ) -> Result<bool, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(false);
        };
        let req = ApiRequest::patch(format!("/workspaces/{id}/members/{user_id}"))
            .body(json!({ "role": role }));
        let result = self.transport.send_unit(&req).await;
        record(&mut self.error, result)?;

        for member in self.members.iter_mut().filter(|m| m.user_id == user_id) {
            member.role = role;
        }
        Ok(true)
    }

    pub async fn remove_member(&mut self, user_id: &str) -> Result<bool, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(false);
        };
        let result = self
            .transport
            .delete(&format!("/workspaces/{id}/members/{user_id}"))
            .await;
        record(&mut self.error, result)?;

        self.members.retain(|m| m.user_id != user_id);
        Ok(true)
    }

    /// `POST /workspaces/:id/leave`. Returns whether the left workspace was
    /// current, mirroring [`WorkspaceStore::delete`].
    pub(crate) async fn leave(&mut self, id: &str) -> Result<bool, ApiError> {
        let result = self
            .transport
            .send_unit(&ApiRequest::post(format!("/workspaces/{id}/leave")))
            .await;
        record(&mut self.error, result)?;

        let was_current = self.cache.remove(id);
        if was_current {
            self.members.clear();
            self.tags.clear();
            self.transport.set_workspace_scope(None).await;
        }
        Ok(was_current)
    }

    pub async fn fetch_tags(&mut self, workspace_id: &str) -> Result<&[Tag], ApiError> {
        let result = self
            .transport
            .get::<ListResponse<Tag>>(&format!("/workspaces/{workspace_id}/tags"))
            .await;
        self.tags = record(&mut self.error, result)?.into_items();
        Ok(&self.tags)
    }

    pub async fn create_tag<B: Serialize + ?Sized>(
        &mut self,
        data: &B,
    ) -> Result<Option<Tag>, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(None);
        };
        let result = self
            .transport
            .post::<_, Tag>(&format!("/workspaces/{id}/tags"), data)
            .await;
        let tag = record(&mut self.error, result)?;
        self.tags.push(tag.clone());
        Ok(Some(tag))
    }

    pub async fn delete_tag(&mut self, tag_id: &str) -> Result<bool, ApiError> {
        let Some(id) = self.current_id().map(str::to_string) else {
            return Ok(false);
        };
        let result = self
            .transport
            .delete(&format!("/workspaces/{id}/tags/{tag_id}"))
            .await;
        record(&mut self.error, result)?;
        self.tags.retain(|t| t.id != tag_id);
        Ok(true)
    }

    /// Forget everything, including the persisted workspace scope.
    pub(crate) async fn clear(&mut self) {
        self.cache.clear();
        self.members.clear();
        self.tags.clear();
        self.error = None;
        self.transport.set_workspace_scope(None).await;
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn list(&self) -> &[Workspace] {
        self.cache.list()
    }

    pub fn current(&self) -> Option<&Workspace> {
        self.cache.current()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.cache.current_id()
    }

    pub fn current_name(&self) -> &str {
        self.cache.current().map_or("", |w| w.name.as_str())
    }

    pub fn count(&self) -> usize {
        self.cache.len()
    }

    pub fn has_workspaces(&self) -> bool {
        !self.cache.is_empty()
    }

    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.cache.find(id)
    }

    pub fn members(&self) -> &[WorkspaceMember] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, user_id: &str) -> Option<&WorkspaceMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, tag_id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag_id)
    }

    pub fn members_by_role(&self) -> BTreeMap<UserRole, Vec<&WorkspaceMember>> {
        let mut grouped: BTreeMap<UserRole, Vec<&WorkspaceMember>> = BTreeMap::new();
        for member in &self.members {
            grouped.entry(member.role).or_default().push(member);
        }
        grouped
    }

    pub fn tags_by_color(&self) -> BTreeMap<&str, Vec<&Tag>> {
        let mut grouped: BTreeMap<&str, Vec<&Tag>> = BTreeMap::new();
        for tag in &self.tags {
            grouped.entry(tag.color.as_str()).or_default().push(tag);
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
