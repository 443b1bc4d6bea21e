mod common;

use axum::http::StatusCode;
use common::{CaptureState, Captured, not_found, spawn_backend, transport};
use desidia::db::{MemoryStore, keys};
use desidia::stores::ProjectQuery;
use desidia::views::TaskFilter;
use desidia::{Desidia, ErrorKind};
use desidia_schema::{LoginRequest, ProjectInput, TaskStatus};
use serde_json::{Value, json};
use std::sync::Arc;

fn task(id: &str, status: &str, order: i64) -> Value {
    json!({ "id": id, "projectId": "p1", "title": format!("Task {id}"), "status": status, "order": order })
}

/// A small fixed backend: two workspaces, two projects in `ws1`, three tasks
/// in `p1`. Reordering is rejected and `/tasks/expired` needs a refresh that
/// never succeeds.
fn backend(c: &Captured) -> (StatusCode, Value) {
    let ok = |v: Value| (StatusCode::OK, v);
    let method = c.method.as_str();
    let path = c.path.trim_start_matches("/api");
    match (method, path) {
        ("POST", "/auth/login") => ok(json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "user": { "id": "u1", "email": "ada@example.com", "name": "Ada", "role": "owner" }
        })),
        ("POST", "/auth/refresh") => (StatusCode::UNAUTHORIZED, json!({ "message": "revoked" })),
        ("GET", "/workspaces") => ok(json!([
            { "id": "ws1", "name": "Acme" },
            { "id": "ws2", "name": "Side project" }
        ])),
        ("GET", "/workspaces/ws1/members") => {
            ok(json!([{ "userId": "u1", "role": "owner" }, { "userId": "u2", "role": "member" }]))
        }
        ("GET", "/workspaces/ws2/members") => ok(json!([{ "userId": "u1", "role": "admin" }])),
        ("GET", "/workspaces/ws1/tags" | "/workspaces/ws2/tags") => ok(json!([])),
        ("DELETE", "/workspaces/ws1") => (StatusCode::NO_CONTENT, Value::Null),
        ("GET", "/workspaces/ws1/projects") => ok(json!([
            { "id": "p1", "name": "Website", "status": "active" },
            { "id": "p2", "name": "Archive", "status": "archived" }
        ])),
        ("PATCH", "/workspaces/ws1/projects/p1") => ok(json!({
            "id": "p1",
            "name": c.body["name"].clone(),
            "status": "active"
        })),
        ("GET", "/workspaces/ws1/projects/p1/members" | "/workspaces/ws1/projects/p2/members") => {
            ok(json!([]))
        }
        ("GET", "/workspaces/ws1/projects/p1/stats") => {
            ok(json!({ "totalTasks": 3, "completedTasks": 1, "overdueTasks": 0 }))
        }
        ("GET", "/workspaces/ws1/projects/p2/stats") => ok(json!({})),
        ("GET", "/projects/p1/tasks") => ok(json!({
            "tasks": [task("t1", "todo", 0), task("t2", "todo", 1), task("t3", "done", 0)],
            "total": 42,
            "page": 1,
            "limit": 50
        })),
        ("GET", "/tasks/t1") => ok(task("t1", "todo", 0)),
        ("GET", "/tasks/t1/subtasks") => ok(json!([
            { "id": "s1", "title": "Draft", "isCompleted": true },
            { "id": "s2", "title": "Review", "isCompleted": false }
        ])),
        ("GET", "/tasks/t1/comments" | "/tasks/t1/activity") => ok(json!([])),
        ("DELETE", "/tasks/t1") => (StatusCode::NO_CONTENT, Value::Null),
        ("POST", "/tasks/bulk-update") => ok(json!({ "updated": 2 })),
        ("GET", "/tasks/expired") => (StatusCode::UNAUTHORIZED, json!({ "message": "jwt expired" })),
        ("POST", "/projects/p1/tasks/reorder") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": "reorder failed" }),
        ),
        ("GET", "/notifications") if c.query.as_deref().is_some_and(|q| q.contains("page=1")) => {
            ok(json!({
                "notifications": [
                    { "id": "n1", "title": "Assigned", "isRead": false },
                    { "id": "n2", "title": "Done", "isRead": true }
                ],
                "total": 5,
                "unreadCount": 1
            }))
        }
        ("GET", "/notifications") => (StatusCode::SERVICE_UNAVAILABLE, Value::Null),
        ("PATCH", "/notifications/n1/read") => (StatusCode::NO_CONTENT, Value::Null),
        _ => not_found(),
    }
}

async fn desidia_with(storage: Arc<MemoryStore>) -> (Desidia, CaptureState) {
    let (base, capture) = spawn_backend(backend).await;
    let transport = transport(&base, storage);
    transport.restore().await;
    (Desidia::with_transport(transport), capture)
}

/// Workspace `ws1` selected, its projects listed, `p1` selected and its
/// tasks loaded.
async fn loaded() -> (Desidia, CaptureState) {
    let (mut ctx, capture) = desidia_with(Arc::new(MemoryStore::new())).await;
    ctx.fetch_workspaces().await.unwrap();
    ctx.projects_mut()
        .fetch_projects("ws1", &ProjectQuery::default())
        .await
        .unwrap();
    ctx.select_project("p1").await.unwrap();
    ctx.tasks_mut().fetch_tasks("p1", &[]).await.unwrap();
    (ctx, capture)
}

#[tokio::test]
async fn fetch_workspaces_selects_first_and_loads_members_and_tags() {
    let (mut ctx, capture) = desidia_with(Arc::new(MemoryStore::new())).await;

    let listed = ctx.fetch_workspaces().await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(ctx.workspaces().current_id(), Some("ws1"));
    assert_eq!(ctx.workspaces().member_count(), 2);
    assert_eq!(ctx.transport().workspace_scope().as_deref(), Some("ws1"));
    let members_req = capture
        .requests()
        .into_iter()
        .find(|c| c.is("GET", "/api/workspaces/ws1/members"))
        .unwrap();
    assert_eq!(members_req.workspace(), Some("ws1"));
}

#[tokio::test]
async fn fetch_workspaces_prefers_persisted_workspace() {
    let storage = Arc::new(MemoryStore::with_entries([(keys::CURRENT_WORKSPACE_ID, "ws2")]));
    let (mut ctx, capture) = desidia_with(storage).await;

    ctx.fetch_workspaces().await.unwrap();

    assert_eq!(ctx.workspaces().current_name(), "Side project");
    assert_eq!(capture.count("GET", "/api/workspaces/ws1/members"), 0);
    assert_eq!(capture.count("GET", "/api/workspaces/ws2/members"), 1);
}

#[tokio::test]
async fn switching_workspace_clears_projects_and_tasks() {
    let (mut ctx, capture) = loaded().await;
    assert_eq!(ctx.projects().current_id(), Some("p1"));
    assert_eq!(ctx.tasks().count(), 3);

    ctx.select_workspace("ws2").await.unwrap();

    assert_eq!(ctx.workspaces().current_id(), Some("ws2"));
    assert!(ctx.projects().list().is_empty());
    assert!(ctx.projects().current().is_none());
    assert!(ctx.projects().stats().is_none());
    assert!(ctx.tasks().list().is_empty());
    assert!(ctx.tasks().current().is_none());
    let last = capture.requests().pop().unwrap();
    assert_eq!(last.workspace(), Some("ws2"));
}

#[tokio::test]
async fn selecting_project_loads_members_and_stats() {
    let (ctx, capture) = loaded().await;

    assert_eq!(ctx.projects().stats().map(|s| s.total_tasks), Some(3));
    assert_eq!(capture.count("GET", "/api/workspaces/ws1/projects/p1/members"), 1);
    assert_eq!(capture.count("GET", "/api/workspaces/ws1/projects/p1/stats"), 1);
    assert_eq!(ctx.projects().active_projects().len(), 1);
    assert_eq!(ctx.projects().archived_projects().len(), 1);
}

#[tokio::test]
async fn project_update_replaces_list_entry_and_current() {
    let (mut ctx, _capture) = loaded().await;

    let input = ProjectInput {
        name: Some("Website v2".to_string()),
        ..Default::default()
    };
    ctx.projects_mut().update("ws1", "p1", &input).await.unwrap();

    assert_eq!(ctx.projects().current_name(), "Website v2");
    assert_eq!(ctx.projects().project("p1").unwrap().name, "Website v2");
    assert_eq!(ctx.projects().count(), 2);
}

#[tokio::test]
async fn paged_task_list_records_total_and_sends_filters() {
    let (mut ctx, capture) = loaded().await;
    ctx.tasks_mut()
        .set_filter(TaskFilter::Status(Some(TaskStatus::InProgress)));
    ctx.tasks_mut().set_filter(TaskFilter::Search("docs".to_string()));

    ctx.tasks_mut().fetch_tasks("p1", &[]).await.unwrap();

    assert_eq!(ctx.tasks().pagination().total, 42);
    let last = capture.requests().pop().unwrap();
    assert_eq!(
        last.query.as_deref(),
        Some("page=1&limit=50&status=in_progress&search=docs")
    );
}

#[tokio::test]
async fn deleting_current_task_clears_its_detail() {
    let (mut ctx, _capture) = loaded().await;
    ctx.tasks_mut().fetch_task("t1").await.unwrap();
    assert_eq!(ctx.tasks().subtasks().len(), 2);
    assert_eq!(ctx.tasks().subtask_progress(), 50);

    let was_current = ctx.tasks_mut().delete("t1").await.unwrap();

    assert!(was_current);
    assert!(ctx.tasks().current().is_none());
    assert!(ctx.tasks().subtasks().is_empty());
    assert!(ctx.tasks().task("t1").is_none());
    assert_eq!(ctx.tasks().count(), 2);
}

#[tokio::test]
async fn selecting_listed_task_reuses_cached_copy() {
    let (mut ctx, capture) = loaded().await;

    ctx.tasks_mut().select("t1").await.unwrap();

    assert_eq!(ctx.tasks().current_id(), Some("t1"));
    assert_eq!(capture.count("GET", "/api/tasks/t1"), 0);
    assert_eq!(capture.count("GET", "/api/tasks/t1/subtasks"), 1);
    assert_eq!(ctx.tasks().subtasks().len(), 2);
}

#[tokio::test]
async fn rejected_reorder_keeps_the_local_move() {
    let (mut ctx, capture) = loaded().await;

    let err = ctx
        .tasks_mut()
        .reorder("p1", "t1", TaskStatus::Done, 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(ctx.tasks().error(), Some("reorder failed"));
    let moved = ctx.tasks().task("t1").unwrap();
    assert_eq!(moved.status, TaskStatus::Done);
    assert_eq!(moved.order, 1);
    assert_eq!(ctx.tasks().by_status().done.len(), 2);

    let sent = capture
        .requests()
        .into_iter()
        .find(|c| c.is("POST", "/api/projects/p1/tasks/reorder"))
        .unwrap();
    assert_eq!(
        sent.body,
        json!({ "taskId": "t1", "targetStatus": "done", "newOrder": 1 })
    );
}

#[tokio::test]
async fn unreadable_bulk_update_reply_is_reported() {
    let (mut ctx, capture) = loaded().await;

    let err = ctx
        .tasks_mut()
        .bulk_update(&["t1", "t2"], &json!({ "status": "done" }))
        .await
        .unwrap_err();

    assert_eq!(err.code, "DECODE_ERROR");
    assert!(err.status.is_none());
    assert_eq!(ctx.tasks().error(), Some(err.message.as_str()));
    assert_eq!(ctx.tasks().task("t1").unwrap().status, TaskStatus::Todo);

    let sent = capture
        .requests()
        .into_iter()
        .find(|c| c.is("POST", "/api/tasks/bulk-update"))
        .unwrap();
    assert_eq!(sent.body, json!({ "status": "done", "taskIds": ["t1", "t2"] }));
}

#[tokio::test]
async fn switching_project_through_context_clears_tasks() {
    let (mut ctx, _capture) = loaded().await;
    ctx.tasks_mut().select("t1").await.unwrap();
    assert_eq!(ctx.tasks().count(), 3);

    let selected = ctx.select_project("p2").await.unwrap();

    assert_eq!(selected.map(|p| p.id), Some("p2".to_string()));
    assert_eq!(ctx.projects().current_id(), Some("p2"));
    assert!(ctx.tasks().list().is_empty());
    assert!(ctx.tasks().current().is_none());
    assert!(ctx.tasks().subtasks().is_empty());
}

#[tokio::test]
async fn deleting_current_workspace_selects_the_next_one() {
    let (mut ctx, _capture) = loaded().await;

    ctx.delete_workspace("ws1").await.unwrap();

    assert_eq!(ctx.workspaces().count(), 1);
    assert_eq!(ctx.workspaces().current_id(), Some("ws2"));
    assert_eq!(ctx.transport().workspace_scope().as_deref(), Some("ws2"));
    assert!(ctx.projects().list().is_empty());
    assert!(ctx.tasks().list().is_empty());
}

#[tokio::test]
async fn expired_session_clears_every_store() {
    let (mut ctx, _capture) = loaded().await;
    ctx.session_mut()
        .login(&LoginRequest {
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    assert!(ctx.session().is_authenticated());

    let err = ctx.tasks_mut().fetch_task("expired").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthExpired);

    assert!(ctx.handle_auth_events().await);
    assert!(!ctx.session().is_authenticated());
    assert!(ctx.session().user().is_none());
    assert!(!ctx.workspaces().has_workspaces());
    assert!(ctx.workspaces().members().is_empty());
    assert!(ctx.projects().list().is_empty());
    assert!(ctx.tasks().list().is_empty());
    assert!(ctx.transport().workspace_scope().is_none());

    assert!(!ctx.handle_auth_events().await);
}

#[tokio::test]
async fn notifications_count_down_once_and_keep_page_on_failure() {
    let (mut ctx, _capture) = desidia_with(Arc::new(MemoryStore::new())).await;

    ctx.notifications_mut().fetch_notifications().await.unwrap();
    assert_eq!(ctx.notifications().unread_count(), 1);
    assert!(ctx.notifications().has_more());

    ctx.notifications_mut().mark_as_read("n1").await.unwrap();
    ctx.notifications_mut().mark_as_read("n1").await.unwrap();
    assert_eq!(ctx.notifications().unread_count(), 0);
    assert_eq!(ctx.notifications().read().len(), 2);

    let err = ctx.notifications_mut().load_more().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(ctx.notifications().page(), 1);
    assert_eq!(ctx.notifications().notifications().len(), 2);
}
