pub mod activity;
pub mod auth;
mod de;
pub mod error_body;
pub mod input;
pub mod list;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;
pub mod workspace;

pub use activity::ActivityLog;
pub use auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RefreshResponse,
    RegisterRequest, ResetPasswordRequest,
};
pub use error_body::ApiErrorBody;
pub use input::{MemberInvite, ProjectInput, SubtaskInput, TagInput, TaskInput, WorkspaceInput};
pub use list::{ListResponse, NotificationPage, Page};
pub use notification::{Notification, NotificationType, UnreadCount};
pub use project::{Project, ProjectSettings, ProjectStats, ProjectStatus};
pub use task::{
    Attachment, Comment, ReorderRequest, Subtask, Task, TaskPriority, TaskStatus,
};
pub use user::{User, UserRole, UserSettings};
pub use workspace::{Tag, ViewType, Workspace, WorkspaceMember, WorkspaceSettings};

/// Entities addressed by a stable server-assigned id.
///
/// Stores resolve "current" pointers through this id rather than by value, so an
/// updated copy of an entity replaces the old one wherever it is held.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_identified!(
    Workspace,
    Tag,
    Project,
    Task,
    Subtask,
    Comment,
    Attachment,
    ActivityLog,
    Notification,
);
