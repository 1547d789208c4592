//! V1 API routes.
//!
//! Each route is gated by its own [`AuthorizeLayer`], so the policy that
//! guards an operation is declared next to the route that exposes it.
//!
//! # Endpoints
//!
//! ## Users
//! - `GET /api/v1/users` - List users (filter by role, managerId, isActive)
//! - `POST /api/v1/users` - Create a user
//! - `GET /api/v1/users/:id` - Get user by id
//! - `PUT /api/v1/users/:id` - Update a user
//! - `DELETE /api/v1/users/:id` - Deactivate a user
//!
//! ## Posts
//! - `GET /api/v1/posts` - List posts (filter by authorId, isPublished, managerId)
//! - `POST /api/v1/posts` - Create a post
//! - `GET /api/v1/posts/:id` - Get post by id
//! - `PUT /api/v1/posts/:id` - Update a post
//! - `DELETE /api/v1/posts/:id` - Delete a post
//! - `PATCH /api/v1/posts/:id/publish` - Publish a post
//!
//! ## Logs
//! - `GET /api/v1/logs` - Query retained audit events
//!
//! ## System
//! - `GET /health` - Liveness probe (unauthenticated)

use axum::{
    handler::Handler,
    routing::{delete, get, patch, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, AppState};
use crate::audit::AuditSink;
use crate::middleware::{AuthLayer, AuthenticationProvider};
use crate::rbac::{AccessPolicy, AuthorizeLayer, TargetSource};
use crate::store::ResourceLookup;

/// V1 API prefix.
pub const V1_PREFIX: &str = "/api/v1";

/// Build the full application router.
pub fn api_router(
    state: AppState,
    lookup: Arc<dyn ResourceLookup>,
    audit: Arc<dyn AuditSink>,
    identity: Arc<dyn AuthenticationProvider>,
) -> Router {
    let authz = move |policy: AccessPolicy, source: TargetSource| {
        AuthorizeLayer::new(policy, source, lookup.clone(), audit.clone())
    };

    let v1 = Router::new()
        // User endpoints
        .route(
            "/users",
            get(handlers::list_users
                .layer(authz(AccessPolicy::list_users(), TargetSource::None)))
            .post(handlers::create_user.layer(authz(
                AccessPolicy::create_user(),
                TargetSource::BodyField("managerId"),
            ))),
        )
        .route(
            "/users/:id",
            get(handlers::get_user.layer(authz(AccessPolicy::get_user(), TargetSource::None))),
        )
        .route(
            "/users/:id",
            put(handlers::update_user
                .layer(authz(AccessPolicy::update_user(), TargetSource::PathTail))),
        )
        .route(
            "/users/:id",
            delete(
                handlers::delete_user
                    .layer(authz(AccessPolicy::delete_user(), TargetSource::PathTail)),
            ),
        )
        // Post endpoints
        .route(
            "/posts",
            get(handlers::list_posts
                .layer(authz(AccessPolicy::list_posts(), TargetSource::None)))
            .post(
                handlers::create_post
                    .layer(authz(AccessPolicy::create_post(), TargetSource::None)),
            ),
        )
        .route(
            "/posts/:id",
            get(handlers::get_post.layer(authz(AccessPolicy::get_post(), TargetSource::None))),
        )
        .route(
            "/posts/:id",
            put(handlers::update_post
                .layer(authz(AccessPolicy::update_post(), TargetSource::PathTail))),
        )
        .route(
            "/posts/:id",
            delete(
                handlers::delete_post
                    .layer(authz(AccessPolicy::delete_post(), TargetSource::PathTail)),
            ),
        )
        .route(
            "/posts/:id/publish",
            patch(handlers::publish_post.layer(authz(
                AccessPolicy::publish_post(),
                TargetSource::PathBeforeSuffix("publish"),
            ))),
        )
        // Log endpoints
        .route(
            "/logs",
            get(handlers::read_logs.layer(authz(AccessPolicy::read_logs(), TargetSource::None))),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest(V1_PREFIX, v1)
        .layer(AuthLayer::new(identity))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// V1 route constants for use in clients and tests.
pub mod paths {
    pub const USERS: &str = "/api/v1/users";
    pub const USER: &str = "/api/v1/users/:id";

    pub const POSTS: &str = "/api/v1/posts";
    pub const POST: &str = "/api/v1/posts/:id";
    pub const POST_PUBLISH: &str = "/api/v1/posts/:id/publish";

    pub const LOGS: &str = "/api/v1/logs";

    pub const HEALTH: &str = "/health";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_constants() {
        assert!(paths::USERS.starts_with(V1_PREFIX));
        assert!(paths::POSTS.starts_with(V1_PREFIX));
        assert!(paths::LOGS.starts_with(V1_PREFIX));
    }
}
