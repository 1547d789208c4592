//! # Palisade Core
//!
//! A role-based authorization engine with an HTTP API for a small
//! users-and-posts system.
//!
//! ## Architecture
//!
//! - **RBAC**: static role-permission table, ownership and manager-scope
//!   rules, and composable per-route access policies
//! - **Authorization Middleware**: Axum layers that resolve the caller's
//!   identity and evaluate one policy per route
//! - **Services**: entity-level rules for users and posts (role
//!   assignment reach, reporting-line checks, publishing)
//! - **Store**: trait-based persistence with an in-memory implementation
//! - **Audit**: structured audit events with bounded in-memory retention
//!   behind the log-read API
//! - **Telemetry**: structured logging and Prometheus metrics

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rbac;
pub mod services;
pub mod store;
pub mod telemetry;

pub use error::{ErrorCode, PalisadeError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{api_router, ApiResponse, AppState};
    pub use crate::audit::{
        AuditAction, AuditEvent, AuditLevel, AuditSink, ChannelAuditSink, LogFilter,
        MemoryAuditLog, NoopAuditSink,
    };
    pub use crate::error::{ErrorCode, PalisadeError, Result};
    pub use crate::middleware::{AuthLayer, AuthenticationProvider, HeaderIdentity};
    pub use crate::rbac::{
        AccessContext, AccessDecision, AccessPolicy, Action, AuthorizeLayer, Check, DenyReason,
        Permission, Principal, RbacContext, Resource, ResourceRef, Role, TargetSource, UserId,
    };
    pub use crate::services::{
        CreatePost, CreateUser, PostService, UpdatePost, UpdateUser, UserService,
    };
    pub use crate::store::{
        InMemoryStore, PostFilter, PostRecord, PostStore, ResourceLookup, UserFilter,
        UserRecord, UserStore,
    };
}
