#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use desidia::Transport;
use desidia::db::MemoryStore;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

type Responder = Arc<dyn Fn(&Captured) -> (StatusCode, Value) + Send + Sync>;

#[derive(Clone)]
pub struct CaptureState {
    pub reqs: Arc<Mutex<Vec<Captured>>>,
    responder: Responder,
}

impl CaptureState {
    pub fn requests(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    /// `METHOD /path` of every request, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Captured {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
    }

    pub fn workspace(&self) -> Option<&str> {
        self.headers
            .get("x-workspace-id")
            .and_then(|v| v.to_str().ok())
    }
}

async fn capture(
    State(state): State<CaptureState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let captured = Captured {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let (status, value) = (state.responder)(&captured);
    state.reqs.lock().unwrap().push(captured);

    if value.is_null() {
        status.into_response()
    } else {
        (status, Json(value)).into_response()
    }
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// Spawn a backend answering every request through `responder`. Returns the
/// API base URL (`http://127.0.0.1:<port>/api`) and the capture log.
pub async fn spawn_backend<F>(responder: F) -> (Url, CaptureState)
where
    F: Fn(&Captured) -> (StatusCode, Value) + Send + Sync + 'static,
{
    let state = CaptureState {
        reqs: Arc::new(Mutex::new(Vec::new())),
        responder: Arc::new(responder),
    };
    let app = Router::new().fallback(capture).with_state(state.clone());
    let base = spawn_test_server(app).await;
    (base.join("/api").expect("api base"), state)
}

pub fn transport(base: &Url, storage: Arc<MemoryStore>) -> Arc<Transport> {
    Arc::new(
        Transport::with_client(reqwest::Client::new(), base.clone(), storage)
            .expect("build transport"),
    )
}

pub fn not_found() -> (StatusCode, Value) {
    (
        StatusCode::NOT_FOUND,
        serde_json::json!({ "message": "Not found" }),
    )
}
