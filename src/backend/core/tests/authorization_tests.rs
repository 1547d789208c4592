//! End-to-end authorization tests over the HTTP API.
//!
//! Requests are driven through the full router (identity layer, per-route
//! authorization layers, handlers) with identity supplied via the trusted
//! gateway headers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use palisade_core::api::{api_router, AppState};
use palisade_core::audit::MemoryAuditLog;
use palisade_core::middleware::HeaderIdentity;
use palisade_core::rbac::Role;
use palisade_core::services::{PostService, UserService};
use palisade_core::store::{InMemoryStore, PostRecord, PostStore, UserRecord, UserStore};

struct TestApp {
    router: Router,
    admin: UserRecord,
    manager_one: UserRecord,
    manager_two: UserRecord,
    operator_one: UserRecord,
    operator_two: UserRecord,
    post_one: PostRecord,
    post_two: PostRecord,
}

async fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(MemoryAuditLog::new(256));

    let admin = UserStore::insert(store.as_ref(), UserRecord::new("ada", Role::Admin, None))
        .await
        .unwrap();
    let manager_one = UserStore::insert(
        store.as_ref(),
        UserRecord::new("marta", Role::Manager, None),
    )
    .await
    .unwrap();
    let manager_two = UserStore::insert(
        store.as_ref(),
        UserRecord::new("mira", Role::Manager, None),
    )
    .await
    .unwrap();
    let operator_one = UserStore::insert(
        store.as_ref(),
        UserRecord::new("otto", Role::Operator, Some(manager_one.id.clone())),
    )
    .await
    .unwrap();
    let operator_two = UserStore::insert(
        store.as_ref(),
        UserRecord::new("olga", Role::Operator, Some(manager_two.id.clone())),
    )
    .await
    .unwrap();
    let post_one = PostStore::insert(
        store.as_ref(),
        PostRecord::new("first", "by otto", operator_one.id.clone()),
    )
    .await
    .unwrap();
    let post_two = PostStore::insert(
        store.as_ref(),
        PostRecord::new("second", "by olga", operator_two.id.clone()),
    )
    .await
    .unwrap();

    let state = AppState {
        users: UserService::new(store.clone(), audit.clone()),
        posts: PostService::new(store.clone(), store.clone(), audit.clone()),
        audit_log: audit.clone(),
    };
    let router = api_router(state, store, audit, Arc::new(HeaderIdentity));

    TestApp {
        router,
        admin,
        manager_one,
        manager_two,
        operator_one,
        operator_two,
        post_one,
        post_two,
    }
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    identity: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = identity {
        builder = builder.header("x-user-id", id).header("x-user-role", role);
    }
    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

fn as_identity(user: &UserRecord) -> (&str, &str) {
    (user.id.as_str(), user.role.as_str())
}

#[tokio::test]
async fn unauthenticated_requests_get_401() {
    let app = test_app().await;
    let (status, body) = send(&app.router, "GET", "/api/v1/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn unrecognized_role_header_is_unauthenticated() {
    let app = test_app().await;
    let (status, _) = send(
        &app.router,
        "GET",
        "/api/v1/users",
        Some(("u-1", "superuser")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = test_app().await;
    let (status, body) = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn operator_can_read_but_not_create_users() {
    let app = test_app().await;
    let identity = as_identity(&app.operator_one);

    let (status, body) = send(&app.router, "GET", "/api/v1/users", Some(identity), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().len() >= 5);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({"username": "intruder", "role": "operator"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSION");
}

#[tokio::test]
async fn operator_updates_own_post_only() {
    let app = test_app().await;
    let identity = as_identity(&app.operator_one);

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/posts/{}", app.post_one.id),
        Some(identity),
        Some(json!({"title": "edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "edited");

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/posts/{}", app.post_two.id),
        Some(identity),
        Some(json!({"title": "hijack"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_OWNER");
}

#[tokio::test]
async fn operator_cannot_update_users_even_themself() {
    let app = test_app().await;
    let identity = as_identity(&app.operator_one);

    // Permission is checked before ownership, so the denial is about the
    // missing update:user grant, not about ownership.
    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/users/{}", app.operator_one.id.as_str()),
        Some(identity),
        Some(json!({"username": "renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSION");
}

#[tokio::test]
async fn manager_publishes_only_their_team_posts() {
    let app = test_app().await;
    let identity = as_identity(&app.manager_one);

    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/api/v1/posts/{}/publish", app.post_one.id),
        Some(identity),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], true);
    assert_eq!(
        body["data"]["publishedBy"],
        app.manager_one.id.as_str()
    );

    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/api/v1/posts/{}/publish", app.post_two.id),
        Some(identity),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_MANAGER_OF_TARGET");
}

#[tokio::test]
async fn operator_cannot_publish_their_own_post() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/api/v1/posts/{}/publish", app.post_one.id),
        Some(as_identity(&app.operator_one)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSION");
}

#[tokio::test]
async fn manager_creates_operators_in_their_own_scope() {
    let app = test_app().await;
    let identity = as_identity(&app.manager_one);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({
            "username": "newhire",
            "role": "operator",
            "managerId": app.manager_one.id.as_str(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "operator");

    // Claiming another manager's scope is rejected.
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({
            "username": "poached",
            "role": "operator",
            "managerId": app.manager_two.id.as_str(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_MANAGER_OF_TARGET");

    // Omitting the scope entirely is a malformed request for a manager.
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({"username": "floating", "role": "operator"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "MALFORMED_TARGET_REFERENCE");
}

#[tokio::test]
async fn admin_creates_managers_but_not_admins() {
    let app = test_app().await;
    let identity = as_identity(&app.admin);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({"username": "newmanager", "role": "manager"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(identity),
        Some(json!({"username": "usurper", "role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INVALID_ROLE_ASSIGNMENT");
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/users",
        Some(as_identity(&app.admin)),
        Some(json!({"username": "otto", "role": "operator"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "DUPLICATE_RECORD");
}

#[tokio::test]
async fn unknown_targets_are_404() {
    let app = test_app().await;
    let identity = as_identity(&app.admin);

    let (status, body) = send(
        &app.router,
        "PUT",
        "/api/v1/users/no-such-user",
        Some(identity),
        Some(json!({"username": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "RESOURCE_NOT_FOUND");

    let (status, _) = send(
        &app.router,
        "PATCH",
        "/api/v1/posts/no-such-post/publish",
        Some(identity),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manager_updates_only_their_operators() {
    let app = test_app().await;
    let identity = as_identity(&app.manager_one);

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/users/{}", app.operator_one.id.as_str()),
        Some(identity),
        Some(json!({"username": "otto-renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "otto-renamed");

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/users/{}", app.operator_two.id.as_str()),
        Some(identity),
        Some(json!({"username": "olga-renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_MANAGER_OF_TARGET");
}

#[tokio::test]
async fn user_delete_is_a_soft_deactivation() {
    let app = test_app().await;
    let admin = as_identity(&app.admin);

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/v1/users/{}", app.operator_one.id.as_str()),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/users/{}", app.operator_one.id.as_str()),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);
}

#[tokio::test]
async fn post_delete_removes_the_record() {
    let app = test_app().await;
    let identity = as_identity(&app.operator_one);

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/v1/posts/{}", app.post_one.id),
        Some(identity),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app.router,
        "GET",
        &format!("/api/v1/posts/{}", app.post_one.id),
        Some(identity),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_posts_belong_to_the_caller() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/posts",
        Some(as_identity(&app.operator_one)),
        Some(json!({"title": "mine", "content": "words"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["authorId"], app.operator_one.id.as_str());
    assert_eq!(body["data"]["isPublished"], false);
}

#[tokio::test]
async fn post_listing_filters_by_manager_scope() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        "GET",
        &format!(
            "/api/v1/posts?managerId={}",
            app.manager_one.id.as_str()
        ),
        Some(as_identity(&app.manager_one)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], app.post_one.id);
}

#[tokio::test]
async fn only_admins_read_the_audit_log() {
    let app = test_app().await;

    // A denied attempt leaves an audit trail.
    let (_, _) = send(
        &app.router,
        "PUT",
        &format!("/api/v1/posts/{}", app.post_two.id),
        Some(as_identity(&app.operator_one)),
        Some(json!({"title": "hijack"})),
    )
    .await;

    let (status, body) = send(
        &app.router,
        "GET",
        "/api/v1/logs",
        Some(as_identity(&app.admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["total"].as_u64().unwrap() >= 1);
    let first = &body["data"]["logs"][0];
    assert_eq!(first["user_id"], app.operator_one.id.as_str());

    for denied in [
        as_identity(&app.manager_one),
        as_identity(&app.operator_one),
    ] {
        let (status, body) = send(&app.router, "GET", "/api/v1/logs", Some(denied), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSION");
    }
}
