//! API request handlers with proper error propagation.
//!
//! All handlers return `Result<impl IntoResponse, PalisadeError>` so that
//! errors are automatically converted to the right HTTP status via the
//! `IntoResponse` implementation on `PalisadeError`. Authorization has
//! already happened by the time a handler runs; handlers extract the
//! [`RbacContext`] for the verified caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use super::{ApiResponse, AppState};
use crate::audit::LogFilter;
use crate::error::PalisadeError;
use crate::rbac::{RbacContext, UserId};
use crate::services::{CreatePost, CreateUser, UpdatePost, UpdateUser};
use crate::store::{PostFilter, PostRecord, UserFilter, UserRecord};

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// User Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub manager_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id.0,
            username: user.username,
            role: user.role.to_string(),
            manager_id: user.manager_id.map(|m| m.0),
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse, PalisadeError> {
    let users: Vec<UserResponse> = state
        .users
        .list(&filter)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PalisadeError> {
    let user = state.users.get(&UserId::new(id)).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

pub async fn create_user(
    State(state): State<AppState>,
    ctx: RbacContext,
    Json(input): Json<CreateUser>,
) -> Result<impl IntoResponse, PalisadeError> {
    if input.username.trim().is_empty() {
        return Err(PalisadeError::validation("Username cannot be empty"));
    }
    let user = state.users.create(&ctx.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(user))),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    ctx: RbacContext,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> Result<impl IntoResponse, PalisadeError> {
    let user = state
        .users
        .update(&ctx.principal, &UserId::new(id), input)
        .await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RbacContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PalisadeError> {
    state.users.delete(&ctx.principal, &UserId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Post Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub is_published: bool,
    pub published_at: Option<String>,
    pub published_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostRecord> for PostResponse {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id.0,
            is_published: post.is_published,
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            published_by: post.published_by.map(|p| p.0),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<impl IntoResponse, PalisadeError> {
    let posts: Vec<PostResponse> = state
        .posts
        .list(&filter)
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(posts)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PalisadeError> {
    let post = state.posts.get(&id).await?;
    Ok(Json(ApiResponse::success(PostResponse::from(post))))
}

pub async fn create_post(
    State(state): State<AppState>,
    ctx: RbacContext,
    Json(input): Json<CreatePost>,
) -> Result<impl IntoResponse, PalisadeError> {
    if input.title.trim().is_empty() {
        return Err(PalisadeError::validation("Title cannot be empty"));
    }
    let post = state.posts.create(&ctx.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PostResponse::from(post))),
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    ctx: RbacContext,
    Path(id): Path<String>,
    Json(input): Json<UpdatePost>,
) -> Result<impl IntoResponse, PalisadeError> {
    let post = state.posts.update(&ctx.principal, &id, input).await?;
    Ok(Json(ApiResponse::success(PostResponse::from(post))))
}

pub async fn delete_post(
    State(state): State<AppState>,
    ctx: RbacContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PalisadeError> {
    state.posts.delete(&ctx.principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_post(
    State(state): State<AppState>,
    ctx: RbacContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PalisadeError> {
    let post = state.posts.publish(&ctx.principal, &id).await?;
    Ok(Json(ApiResponse::success(PostResponse::from(post))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Log Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn read_logs(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> Result<impl IntoResponse, PalisadeError> {
    let page = state.audit_log.query(&filter);
    Ok(Json(ApiResponse::success(page)))
}
