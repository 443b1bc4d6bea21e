mod common;

use axum::http::StatusCode;
use common::{not_found, spawn_backend, transport};
use desidia::db::{MemoryStore, keys};
use desidia::{ApiRequest, AuthEvent, ErrorKind, TokenPair};
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

fn task_body() -> Value {
    json!({ "id": "t5", "title": "Write docs", "status": "todo", "priority": "medium" })
}

fn seeded_storage() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        (keys::ACCESS_TOKEN, "stale-access"),
        (keys::REFRESH_TOKEN, "refresh-1"),
    ]))
}

#[tokio::test]
async fn auth_and_workspace_headers_are_attached() {
    let (base, capture) = spawn_backend(|c| {
        if c.is("GET", "/api/tasks/t5") {
            (StatusCode::OK, task_body())
        } else {
            not_found()
        }
    })
    .await;
    let transport = transport(&base, Arc::new(MemoryStore::new()));
    transport
        .set_credentials(TokenPair::new("access-1", "refresh-1"))
        .await;
    transport.set_workspace_scope(Some("ws-9")).await;

    let body = transport.send(&ApiRequest::get("/tasks/t5")).await.unwrap();

    assert_eq!(body["id"], "t5");
    let reqs = capture.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].bearer(), Some("access-1"));
    assert_eq!(reqs[0].workspace(), Some("ws-9"));
}

#[tokio::test]
async fn query_pairs_are_encoded() {
    let (base, capture) = spawn_backend(|_| (StatusCode::OK, json!([]))).await;
    let transport = transport(&base, Arc::new(MemoryStore::new()));

    transport
        .send(
            &ApiRequest::get("/projects/p1/tasks")
                .query("page", 2)
                .query("search", "a b"),
        )
        .await
        .unwrap();

    let reqs = capture.requests();
    assert_eq!(reqs[0].path, "/api/projects/p1/tasks");
    assert_eq!(reqs[0].query.as_deref(), Some("page=2&search=a+b"));
    assert!(reqs[0].bearer().is_none());
    assert!(reqs[0].workspace().is_none());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_request_replayed() {
    let (base, capture) = spawn_backend(|c| {
        if c.is("POST", "/api/auth/refresh") {
            (StatusCode::OK, json!({ "accessToken": "fresh-access" }))
        } else if c.is("GET", "/api/tasks/t5") && c.bearer() == Some("fresh-access") {
            (StatusCode::OK, task_body())
        } else if c.is("GET", "/api/tasks/t5") {
            (StatusCode::UNAUTHORIZED, json!({ "message": "jwt expired" }))
        } else {
            not_found()
        }
    })
    .await;
    let storage = seeded_storage();
    let transport = transport(&base, storage.clone());
    assert!(transport.restore().await);

    let body = transport.send(&ApiRequest::get("/tasks/t5")).await.unwrap();

    assert_eq!(body["title"], "Write docs");
    assert_eq!(
        capture.lines(),
        vec![
            "GET /api/tasks/t5",
            "POST /api/auth/refresh",
            "GET /api/tasks/t5",
        ]
    );

    let reqs = capture.requests();
    assert_eq!(reqs[0].bearer(), Some("stale-access"));
    assert!(reqs[1].bearer().is_none());
    assert_eq!(reqs[1].body, json!({ "refreshToken": "refresh-1" }));
    assert_eq!(reqs[2].bearer(), Some("fresh-access"));

    let persisted = storage.snapshot();
    assert_eq!(persisted[keys::ACCESS_TOKEN], "fresh-access");
    assert_eq!(persisted[keys::REFRESH_TOKEN], "refresh-1");
}

#[tokio::test]
async fn rotated_refresh_token_is_persisted() {
    let (base, _capture) = spawn_backend(|c| {
        if c.is("POST", "/api/auth/refresh") {
            (
                StatusCode::OK,
                json!({ "accessToken": "fresh-access", "refreshToken": "refresh-2" }),
            )
        } else if c.bearer() == Some("fresh-access") {
            (StatusCode::OK, task_body())
        } else {
            (StatusCode::UNAUTHORIZED, Value::Null)
        }
    })
    .await;
    let storage = seeded_storage();
    let transport = transport(&base, storage.clone());
    transport.restore().await;

    transport.send(&ApiRequest::get("/tasks/t5")).await.unwrap();

    assert_eq!(storage.snapshot()[keys::REFRESH_TOKEN], "refresh-2");
}

#[tokio::test]
async fn failed_refresh_clears_session_and_signals_expiry() {
    let (base, capture) = spawn_backend(|c| {
        if c.is("POST", "/api/auth/refresh") {
            (StatusCode::UNAUTHORIZED, json!({ "message": "revoked" }))
        } else {
            (StatusCode::UNAUTHORIZED, json!({ "message": "jwt expired" }))
        }
    })
    .await;
    let storage = Arc::new(MemoryStore::with_entries([
        (keys::ACCESS_TOKEN, "stale-access"),
        (keys::REFRESH_TOKEN, "refresh-1"),
        (keys::CURRENT_WORKSPACE_ID, "ws-1"),
    ]));
    let transport = transport(&base, storage.clone());
    transport.restore().await;
    let mut events = transport.subscribe();

    let err = transport
        .send(&ApiRequest::get("/tasks/t5"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AuthExpired);
    assert_eq!(err.status, Some(StatusCode::UNAUTHORIZED));
    assert!(!transport.has_credentials());
    assert!(transport.workspace_scope().is_none());
    assert!(storage.snapshot().is_empty());
    assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
    assert_eq!(capture.count("POST", "/api/auth/refresh"), 1);
    assert_eq!(capture.count("GET", "/api/tasks/t5"), 1);
}

#[tokio::test]
async fn replayed_request_is_not_refreshed_again() {
    let (base, capture) = spawn_backend(|c| {
        if c.is("POST", "/api/auth/refresh") {
            (StatusCode::OK, json!({ "accessToken": "fresh-access" }))
        } else {
            (StatusCode::UNAUTHORIZED, json!({ "message": "still no" }))
        }
    })
    .await;
    let transport = transport(&base, seeded_storage());
    transport.restore().await;

    let err = transport
        .send(&ApiRequest::get("/tasks/t5"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.status, Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.message, "still no");
    assert_eq!(capture.count("POST", "/api/auth/refresh"), 1);
    assert_eq!(capture.count("GET", "/api/tasks/t5"), 2);
    assert!(transport.has_credentials());
}

#[tokio::test]
async fn unauthorized_without_refresh_token_is_returned_as_is() {
    let (base, capture) =
        spawn_backend(|_| (StatusCode::UNAUTHORIZED, json!({ "message": "login first" }))).await;
    let transport = transport(&base, Arc::new(MemoryStore::new()));

    let err = transport
        .send(&ApiRequest::get("/auth/me"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.message, "login first");
    assert_eq!(capture.lines(), vec!["GET /api/auth/me"]);
}

#[tokio::test]
async fn opted_out_request_never_refreshes() {
    let (base, capture) =
        spawn_backend(|_| (StatusCode::UNAUTHORIZED, json!({ "message": "bad password" }))).await;
    let transport = transport(&base, seeded_storage());
    transport.restore().await;

    let err = transport
        .send(&ApiRequest::post("/auth/login").without_auth_refresh())
        .await
        .unwrap_err();

    assert_eq!(err.message, "bad password");
    assert_eq!(capture.lines(), vec!["POST /api/auth/login"]);
    assert!(transport.has_credentials());
}

#[tokio::test]
async fn server_errors_are_normalized_without_retry() {
    let (base, capture) = spawn_backend(|c| {
        if c.path.ends_with("/validate") {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "message": "Invalid input",
                    "code": "VALIDATION_ERROR",
                    "errors": [{ "field": "title" }]
                }),
            )
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, Value::Null)
        }
    })
    .await;
    let transport = transport(&base, seeded_storage());
    transport.restore().await;

    let err = transport
        .send(&ApiRequest::get("/tasks/t5"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "Internal Server Error");
    assert_eq!(err.code, "UNKNOWN_ERROR");

    let err = transport
        .send(&ApiRequest::post("/tasks/validate"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.code, "VALIDATION_ERROR");
    assert_eq!(err.errors.len(), 1);

    assert_eq!(capture.requests().len(), 2);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}/api")).unwrap();
    let transport = transport(&base, Arc::new(MemoryStore::new()));

    let err = transport
        .send(&ApiRequest::get("/workspaces"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.status, None);
    assert_eq!(err.code, "NETWORK_ERROR");
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn empty_success_body_is_null() {
    let (base, _capture) = spawn_backend(|_| (StatusCode::NO_CONTENT, Value::Null)).await;
    let transport = transport(&base, Arc::new(MemoryStore::new()));

    let body = transport
        .send(&ApiRequest::delete("/tasks/t5"))
        .await
        .unwrap();

    assert_eq!(body, Value::Null);
    transport.delete("/tasks/t5").await.unwrap();
}
