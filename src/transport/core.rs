use super::request::ApiRequest;
use crate::config::ApiConfig;
use crate::db::{KeyValueStore, keys};
use crate::error::{ApiError, DesidiaError};
use desidia_schema::{RefreshRequest, RefreshResponse};
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

pub const WORKSPACE_HEADER: &str = "X-Workspace-ID";

const REFRESH_PATH: &str = "auth/refresh";
const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";

/// Signals broadcast to every subscriber of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The refresh token was rejected; tokens and workspace scope are gone.
    SessionExpired,
}

/// Access and refresh token, always stored and cleared together.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
struct Credentials {
    tokens: Option<TokenPair>,
    workspace_id: Option<String>,
}

/// Which try this is for one logical request. Passed by value; a replay
/// gets a fresh counter instead of flipping a flag on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt(u8);

impl Attempt {
    const FIRST: Self = Self(1);
    const MAX: u8 = 2;

    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    fn can_replay(self) -> bool {
        self.0 < Self::MAX
    }
}

/// Shared HTTP pipeline: header injection, error normalization and a
/// single refresh-and-replay on expired access tokens.
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    state: RwLock<Credentials>,
    storage: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl Transport {
    pub fn new(cfg: &ApiConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, DesidiaError> {
        let client = build_client(cfg)?;
        Self::with_client(client, cfg.base_url.clone(), storage)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: Url,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, DesidiaError> {
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            client,
            base_url,
            state: RwLock::new(Credentials::default()),
            storage,
            events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Load persisted tokens and workspace scope. Tokens are restored only
    /// as a complete pair; a lone token is discarded from storage.
    pub async fn restore(&self) -> bool {
        let access = self.load(keys::ACCESS_TOKEN).await;
        let refresh = self.load(keys::REFRESH_TOKEN).await;
        let workspace_id = self.load(keys::CURRENT_WORKSPACE_ID).await;

        let tokens = match (access, refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            (None, None) => None,
            _ => {
                warn!("Discarding incomplete persisted token pair");
                self.forget(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN]).await;
                None
            }
        };
        let restored = tokens.is_some();

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.tokens = tokens;
            state.workspace_id = workspace_id;
        }

        debug!(restored, "Transport state restored");
        restored
    }

    pub async fn set_credentials(&self, pair: TokenPair) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.tokens = Some(pair.clone());
        }
        self.store(keys::ACCESS_TOKEN, &pair.access_token).await;
        self.store(keys::REFRESH_TOKEN, &pair.refresh_token).await;
    }

    /// Replace only the access token. Ignored when no pair is held.
    pub async fn set_access_token(&self, access_token: impl Into<String>) {
        let access_token = access_token.into();
        let updated = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match state.tokens.as_mut() {
                Some(pair) => {
                    pair.access_token.clone_from(&access_token);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.store(keys::ACCESS_TOKEN, &access_token).await;
        }
    }

    /// Drop both tokens and the workspace scope, in memory and on disk.
    pub async fn clear_credentials(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.tokens = None;
            state.workspace_id = None;
        }
        self.forget(&[
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::CURRENT_WORKSPACE_ID,
        ])
        .await;
    }

    pub async fn set_workspace_scope(&self, workspace_id: Option<&str>) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.workspace_id = workspace_id.map(str::to_string);
        }
        match workspace_id {
            Some(id) => self.store(keys::CURRENT_WORKSPACE_ID, id).await,
            None => self.forget(&[keys::CURRENT_WORKSPACE_ID]).await,
        }
    }

    pub fn workspace_scope(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .workspace_id
            .clone()
    }

    pub fn has_credentials(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .as_ref()
            .map(|t| t.refresh_token.clone())
    }

    /// Send a request and return the raw JSON body (`null` when empty).
    pub async fn send(&self, req: &ApiRequest) -> Result<Value, ApiError> {
        self.dispatch(req, Attempt::FIRST).await
    }

    pub async fn send_as<T: DeserializeOwned>(&self, req: &ApiRequest) -> Result<T, ApiError> {
        let value = self.send(req).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&e))
    }

    /// Send a request whose response body is irrelevant.
    pub async fn send_unit(&self, req: &ApiRequest) -> Result<(), ApiError> {
        self.send(req).await.map(|_| ())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_as(&ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_as(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_as(&ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_as(&ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_unit(&ApiRequest::delete(path)).await
    }

    async fn dispatch(&self, req: &ApiRequest, attempt: Attempt) -> Result<Value, ApiError> {
        let err = match self.execute(req, attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_unauthorized() || !req.refresh_on_unauthorized || !attempt.can_replay() {
            return Err(err);
        }
        let Some(refresh_token) = self.refresh_token() else {
            return Err(err);
        };

        match self.refresh(&refresh_token).await {
            Ok(()) => {
                debug!(
                    method = %req.method,
                    path = %req.path,
                    "Replaying request with refreshed access token"
                );
                self.execute(req, attempt.next()).await
            }
            Err(refresh_err) => {
                warn!(
                    status = ?refresh_err.status,
                    code = %refresh_err.code,
                    "Token refresh failed, clearing session"
                );
                self.clear_credentials().await;
                // No receivers is not an error for the sender.
                let _ = self.events.send(AuthEvent::SessionExpired);
                Err(ApiError::auth_expired(SESSION_EXPIRED_MESSAGE))
            }
        }
    }

    async fn execute(&self, req: &ApiRequest, attempt: Attempt) -> Result<Value, ApiError> {
        let (access_token, workspace_id) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (
                state.tokens.as_ref().map(|t| t.access_token.clone()),
                state.workspace_id.clone(),
            )
        };

        let mut builder = self
            .client
            .request(req.method.clone(), self.endpoint(&req.path));
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(id) = workspace_id {
            builder = builder.header(WORKSPACE_HEADER, id);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            warn!(method = %req.method, path = %req.path, error = %e, "Request failed");
            ApiError::network(&e)
        })?;
        let status = resp.status();
        debug!(
            method = %req.method,
            path = %req.path,
            status = status.as_u16(),
            attempt = attempt.0,
            "Request completed"
        );

        let bytes = resp.bytes().await.map_err(|e| ApiError::network(&e))?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(&e))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.endpoint(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| ApiError::network(&e))?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| ApiError::network(&e))?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &bytes));
        }
        let refreshed: RefreshResponse =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(&e))?;

        let pair = TokenPair::new(
            refreshed.access_token,
            refreshed
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
        );
        self.set_credentials(pair).await;
        info!("Access token refreshed");
        Ok(())
    }

    /// Append `path` to the base URL, keeping the base path.
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    async fn load(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read persisted value");
                None
            }
        }
    }

    async fn store(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value).await {
            warn!(key, error = %e, "Failed to persist value");
        }
    }

    async fn forget(&self, keys: &[&str]) {
        if let Err(e) = self.storage.remove(keys).await {
            warn!(?keys, error = %e, "Failed to remove persisted values");
        }
    }
}

fn build_client(cfg: &ApiConfig) -> Result<reqwest::Client, DesidiaError> {
    let mut headers = HeaderMap::new();
    let mut builder = reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.timeout());

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    Ok(builder.default_headers(headers).build()?)
}
