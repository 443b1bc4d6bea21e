use super::permission::{Permission, permissions_for};
use crate::error::{ApiError, record};
use crate::transport::{ApiRequest, AuthEvent, TokenPair, Transport};
use desidia_schema::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    User, UserRole, UserSettings,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Partial profile edit; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
}

/// The signed-in user and the lifecycle around it.
pub struct Session {
    transport: Arc<Transport>,
    user: Option<User>,
    is_loading: bool,
    is_initialized: bool,
    error: Option<String>,
}

impl Session {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            user: None,
            is_loading: false,
            is_initialized: false,
            error: None,
        }
    }

    /// Restore persisted tokens and load the user behind them.
    ///
    /// Runs once; later calls return immediately. A failed `/auth/me` logs
    /// the session out instead of surfacing an error.
    pub async fn initialize(&mut self) {
        if self.is_initialized {
            return;
        }
        self.is_loading = true;
        self.error = None;

        if self.transport.restore().await {
            match self.transport.get::<User>("/auth/me").await {
                Ok(user) => {
                    info!(user_id = %user.id, "Session restored");
                    self.user = Some(user);
                }
                Err(err) => {
                    warn!(code = %err.code, "Persisted session rejected, signing out");
                    self.logout().await;
                }
            }
        }

        self.is_loading = false;
        self.is_initialized = true;
    }

    pub async fn login(&mut self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let req = ApiRequest::post("/auth/login").json(credentials)?;
        self.authenticate(req, "Login failed").await
    }

    pub async fn register(&mut self, data: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let req = ApiRequest::post("/auth/register").json(data)?;
        self.authenticate(req, "Registration failed").await
    }

    async fn authenticate(
        &mut self,
        req: ApiRequest,
        fallback: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.is_loading = true;
        self.error = None;

        let result = self
            .transport
            .send_as::<AuthResponse>(&req.without_auth_refresh())
            .await;
        self.is_loading = false;

        let resp = match result {
            Ok(resp) => resp,
            Err(err) => {
                self.error = Some(if err.message.is_empty() {
                    fallback.to_string()
                } else {
                    err.message.clone()
                });
                return Err(err);
            }
        };

        self.transport
            .set_credentials(TokenPair::new(&resp.access_token, &resp.refresh_token))
            .await;
        self.user = Some(resp.user.clone());
        info!(user_id = %resp.user.id, "Signed in");
        Ok(resp)
    }

    /// Best-effort server revocation, then an unconditional local wipe.
    pub async fn logout(&mut self) {
        if self.transport.has_credentials()
            && let Err(err) = self.transport.send_unit(&ApiRequest::post("/auth/logout")).await
        {
            debug!(code = %err.code, "Ignoring logout revocation failure");
        }

        self.user = None;
        self.error = None;
        self.transport.clear_credentials().await;
        info!("Signed out");
    }

    pub async fn update_profile(&mut self, data: &ProfileUpdate) -> Result<User, ApiError> {
        self.is_loading = true;
        self.error = None;
        let result = record(
            &mut self.error,
            self.transport.post::<_, User>("/auth/profile", data).await,
        );
        self.is_loading = false;

        let user = result?;
        self.user = Some(user.clone());
        Ok(user)
    }

    pub async fn change_password(&mut self, data: &ChangePasswordRequest) -> Result<(), ApiError> {
        let req = ApiRequest::post("/auth/change-password").json(data)?;
        self.run_unit(req).await
    }

    pub async fn request_password_reset(&mut self, email: &str) -> Result<(), ApiError> {
        let req = ApiRequest::post("/auth/forgot-password").body(json!({ "email": email }));
        self.run_unit(req).await
    }

    pub async fn reset_password(&mut self, data: &ResetPasswordRequest) -> Result<(), ApiError> {
        let req = ApiRequest::post("/auth/reset-password").json(data)?;
        self.run_unit(req).await
    }

    pub async fn verify_email(&mut self, token: &str) -> Result<(), ApiError> {
        let req = ApiRequest::post("/auth/verify-email").body(json!({ "token": token }));
        self.run_unit(req).await
    }

    pub async fn resend_verification_email(&mut self) -> Result<(), ApiError> {
        self.run_unit(ApiRequest::post("/auth/resend-verification"))
            .await
    }

    async fn run_unit(&mut self, req: ApiRequest) -> Result<(), ApiError> {
        self.is_loading = true;
        self.error = None;
        let result = record(&mut self.error, self.transport.send_unit(&req).await);
        self.is_loading = false;
        result
    }

    /// React to a transport signal. Tokens are already gone on
    /// `SessionExpired`; only the in-memory identity remains to drop.
    pub fn handle_auth_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::SessionExpired => {
                if self.user.take().is_some() {
                    info!("Session expired");
                }
            }
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| permissions_for(u.role).contains(&permission))
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        self.user.as_ref().is_some_and(|u| roles.contains(&u.role))
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.transport.has_credentials()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.name.as_str())
    }

    pub fn user_email(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.email.as_str())
    }

    pub fn user_avatar(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.avatar.as_deref())
    }

    pub fn user_initials(&self) -> String {
        initials(self.user_name())
    }

    pub fn user_role(&self) -> UserRole {
        self.user.as_ref().map_or(UserRole::Member, |u| u.role)
    }

    pub fn is_owner(&self) -> bool {
        self.has_role(&[UserRole::Owner])
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&[UserRole::Owner, UserRole::Admin])
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }
}

fn initials(name: &str) -> String {
    if name.is_empty() {
        return "?".to_string();
    }
    let mut words = name.split(' ');
    let picked: String = match (words.next(), words.next()) {
        (Some(first), Some(second)) => first.chars().take(1).chain(second.chars().take(1)).collect(),
        _ => name.chars().take(2).collect(),
    };
    picked.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use url::Url;

    fn session_with(role: Option<UserRole>) -> Session {
        let transport = Transport::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost/api").expect("base url"),
            Arc::new(MemoryStore::new()),
        )
        .expect("transport");
        let mut session = Session::new(Arc::new(transport));
        session.user = role.map(|role| User {
            id: "u1".into(),
            name: "Ada Lovelace".into(),
            role,
            ..User::default()
        });
        session
    }

    #[test]
    fn initials_follow_name_shape() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("ada"), "AD");
        assert_eq!(initials("x"), "X");
        assert_eq!(initials(""), "?");
    }

    #[test]
    fn permissions_follow_role() {
        assert!(!session_with(None).has_permission(Permission::TaskView));
        assert!(session_with(Some(UserRole::Owner)).has_permission(Permission::WorkspaceManage));
        assert!(session_with(Some(UserRole::Admin)).has_permission(Permission::MemberInvite));
        assert!(!session_with(Some(UserRole::Member)).has_permission(Permission::TaskDelete));
        assert!(!session_with(Some(UserRole::Guest)).has_permission(Permission::TaskCreate));
    }

    #[test]
    fn role_getters() {
        let admin = session_with(Some(UserRole::Admin));
        assert!(admin.is_admin());
        assert!(!admin.is_owner());
        assert!(admin.has_role(&[UserRole::Guest, UserRole::Admin]));
        assert_eq!(admin.user_initials(), "AL");

        let anon = session_with(None);
        assert_eq!(anon.user_role(), UserRole::Member);
        assert_eq!(anon.user_initials(), "?");
        assert!(!anon.is_authenticated());
    }

    #[test]
    fn session_expired_drops_user() {
        let mut s = session_with(Some(UserRole::Member));
        s.handle_auth_event(AuthEvent::SessionExpired);
        assert!(s.user().is_none());
    }
}
