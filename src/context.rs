use crate::config::ApiConfig;
use crate::db::KeyValueStore;
use crate::error::{ApiError, DesidiaError};
use crate::session::Session;
use crate::stores::{NotificationStore, ProjectStore, TaskStore, WorkspaceStore};
use crate::transport::{AuthEvent, Transport};
use desidia_schema::{Project, Workspace};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// One instance of every store sharing a single transport.
///
/// Selection changes go through here so that descendant state (projects
/// under a workspace, tasks under a project) is cleared before anything of
/// the new parent is loaded. The stores are only reachable through
/// accessors, and the workspace and project operations that change or drop
/// the current selection are crate-private.
pub struct Desidia {
    transport: Arc<Transport>,
    events: broadcast::Receiver<AuthEvent>,
    session: Session,
    workspaces: WorkspaceStore,
    projects: ProjectStore,
    tasks: TaskStore,
    notifications: NotificationStore,
}

impl Desidia {
    pub fn new(cfg: &ApiConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, DesidiaError> {
        Ok(Self::with_transport(Arc::new(Transport::new(cfg, storage)?)))
    }

    pub fn with_transport(transport: Arc<Transport>) -> Self {
        Self {
            events: transport.subscribe(),
            session: Session::new(transport.clone()),
            workspaces: WorkspaceStore::new(transport.clone()),
            projects: ProjectStore::new(transport.clone()),
            tasks: TaskStore::new(transport.clone()),
            notifications: NotificationStore::new(transport.clone()),
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn workspaces(&self) -> &WorkspaceStore {
        &self.workspaces
    }

    /// Members, tags and workspace edits. Switching goes through
    /// [`Desidia::select_workspace`].
    pub fn workspaces_mut(&mut self) -> &mut WorkspaceStore {
        &mut self.workspaces
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    /// Listing and editing projects. Switching goes through
    /// [`Desidia::select_project`].
    pub fn projects_mut(&mut self) -> &mut ProjectStore {
        &mut self.projects
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskStore {
        &mut self.tasks
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationStore {
        &mut self.notifications
    }

    /// Drain pending transport signals. A `SessionExpired` wipes the session
    /// and every store. Returns whether the session expired.
    pub async fn handle_auth_events(&mut self) -> bool {
        let mut expired = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.session.handle_auth_event(event);
                    expired |= event == AuthEvent::SessionExpired;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    // Only one kind of event exists, so missed ones are expiries.
                    warn!(skipped, "Auth events lagged");
                    self.session.handle_auth_event(AuthEvent::SessionExpired);
                    expired = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if expired {
            self.clear_stores().await;
        }
        expired
    }

    /// Fetch workspaces and, when none is current, select the persisted
    /// workspace if it is still listed, else the first one.
    pub async fn fetch_workspaces(&mut self) -> Result<Vec<Workspace>, ApiError> {
        let listed = self.workspaces.fetch_workspaces().await?.to_vec();

        if self.workspaces.current().is_none() {
            let persisted = self.transport.workspace_scope();
            let pick = persisted
                .as_deref()
                .and_then(|id| listed.iter().find(|w| w.id == id))
                .or_else(|| listed.first())
                .map(|w| w.id.clone());
            if let Some(id) = pick {
                self.select_workspace(&id).await?;
            }
        }
        Ok(listed)
    }

    /// Switch workspace. Project and task state is always cleared first.
    pub async fn select_workspace(&mut self, id: &str) -> Result<Workspace, ApiError> {
        debug!(workspace_id = id, "Clearing project and task state");
        self.projects.clear();
        self.tasks.clear();
        self.workspaces.select(id).await
    }

    /// Create a workspace and switch to it.
    pub async fn create_workspace<B: Serialize + ?Sized>(
        &mut self,
        data: &B,
    ) -> Result<Workspace, ApiError> {
        let created = self.workspaces.create(data).await?;
        self.select_workspace(&created.id).await?;
        Ok(created)
    }

    /// Delete a workspace. When it was current, descendants are cleared and
    /// the first remaining workspace (if any) is selected.
    pub async fn delete_workspace(&mut self, id: &str) -> Result<(), ApiError> {
        if !self.workspaces.delete(id).await? {
            return Ok(());
        }
        self.projects.clear();
        self.tasks.clear();

        let next = self.workspaces.list().first().map(|w| w.id.clone());
        if let Some(next) = next {
            info!(deleted = id, next = %next, "Current workspace deleted, switching");
            self.select_workspace(&next).await?;
        }
        Ok(())
    }

    /// Leave a workspace, with the same fallback as [`Desidia::delete_workspace`].
    pub async fn leave_workspace(&mut self, id: &str) -> Result<(), ApiError> {
        if !self.workspaces.leave(id).await? {
            return Ok(());
        }
        self.projects.clear();
        self.tasks.clear();

        let next = self.workspaces.list().first().map(|w| w.id.clone());
        if let Some(next) = next {
            self.select_workspace(&next).await?;
        }
        Ok(())
    }

    /// Switch project inside the current workspace. Task state is cleared
    /// first. `Ok(None)` when no workspace is selected.
    pub async fn select_project(&mut self, id: &str) -> Result<Option<Project>, ApiError> {
        let Some(workspace_id) = self.workspaces.current_id().map(str::to_string) else {
            return Ok(None);
        };
        self.tasks.clear();
        self.projects.select(&workspace_id, id).await.map(Some)
    }

    /// Delete a project of the current workspace, clearing tasks when it was
    /// current. Returns `Ok(false)` when no workspace is selected.
    pub async fn delete_project(&mut self, id: &str) -> Result<bool, ApiError> {
        let Some(workspace_id) = self.workspaces.current_id().map(str::to_string) else {
            return Ok(false);
        };
        if self.projects.delete(&workspace_id, id).await? {
            self.tasks.clear();
        }
        Ok(true)
    }

    /// Sign out and reset every store.
    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.clear_stores().await;
    }

    async fn clear_stores(&mut self) {
        self.tasks.clear();
        self.projects.clear();
        self.workspaces.clear().await;
        self.notifications.clear();
    }
}
