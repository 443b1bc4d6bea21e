use desidia_schema::UserRole;
use std::fmt;
use std::str::FromStr;

/// Actions gated by the active user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    WorkspaceManage,
    ProjectCreate,
    ProjectEdit,
    ProjectDelete,
    ProjectView,
    MemberInvite,
    MemberRemove,
    TaskCreate,
    TaskEdit,
    TaskDelete,
    TaskView,
    CommentCreate,
    SettingsView,
}

const ADMIN: &[Permission] = &[
    Permission::WorkspaceManage,
    Permission::ProjectCreate,
    Permission::ProjectEdit,
    Permission::ProjectDelete,
    Permission::MemberInvite,
    Permission::MemberRemove,
    Permission::TaskCreate,
    Permission::TaskEdit,
    Permission::TaskDelete,
    Permission::SettingsView,
];

const MEMBER: &[Permission] = &[
    Permission::ProjectView,
    Permission::TaskCreate,
    Permission::TaskEdit,
    Permission::TaskView,
    Permission::CommentCreate,
];

const GUEST: &[Permission] = &[Permission::ProjectView, Permission::TaskView];

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::WorkspaceManage,
        Permission::ProjectCreate,
        Permission::ProjectEdit,
        Permission::ProjectDelete,
        Permission::ProjectView,
        Permission::MemberInvite,
        Permission::MemberRemove,
        Permission::TaskCreate,
        Permission::TaskEdit,
        Permission::TaskDelete,
        Permission::TaskView,
        Permission::CommentCreate,
        Permission::SettingsView,
    ];

    /// Dotted identifier, e.g. `task.edit`.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::WorkspaceManage => "workspace.manage",
            Permission::ProjectCreate => "project.create",
            Permission::ProjectEdit => "project.edit",
            Permission::ProjectDelete => "project.delete",
            Permission::ProjectView => "project.view",
            Permission::MemberInvite => "member.invite",
            Permission::MemberRemove => "member.remove",
            Permission::TaskCreate => "task.create",
            Permission::TaskEdit => "task.edit",
            Permission::TaskDelete => "task.delete",
            Permission::TaskView => "task.view",
            Permission::CommentCreate => "comment.create",
            Permission::SettingsView => "settings.view",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {s}"))
    }
}

/// Fixed permission set of a role. Owners hold every permission.
pub fn permissions_for(role: UserRole) -> &'static [Permission] {
    match role {
        UserRole::Owner => &Permission::ALL,
        UserRole::Admin => ADMIN,
        UserRole::Member => MEMBER,
        UserRole::Guest => GUEST,
    }
}
