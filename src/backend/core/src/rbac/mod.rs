//! Role-Based Access Control core.
//!
//! This module provides:
//! - **Models**: roles, actions, resources, permissions, principals, and
//!   the two-field target reference scope checks evaluate against
//! - **Role table**: the static role-permission assignments, including the
//!   `manage` wildcard and role-assignment reach
//! - **Scope rules**: the coarse ownership rule and the strict
//!   manager-scope rule, kept as distinct code paths
//! - **Policies**: named, ordered check lists with short-circuit
//!   evaluation and specific denial reasons
//! - **Authorization middleware**: an Axum layer that gates a route on one
//!   policy
//!
//! # Usage
//!
//! ```rust,ignore
//! use palisade_core::rbac::{AccessPolicy, AuthorizeLayer, TargetSource};
//!
//! let app = Router::new().route(
//!     "/api/v1/posts/:id",
//!     put(update_post.layer(AuthorizeLayer::new(
//!         AccessPolicy::update_post(),
//!         TargetSource::PathTail,
//!         lookup,
//!         audit,
//!     ))),
//! );
//! ```

pub mod middleware;
pub mod models;
pub mod policy;
pub mod roles;
pub mod scope;

pub use middleware::{AuthorizeLayer, AuthorizeService, RbacContext, TargetSource};
pub use models::{
    AccessDecision, Action, DenyReason, Permission, Principal, Resource, ResourceRef, Role,
    UserId,
};
pub use policy::{AccessContext, AccessPolicy, Check};
pub use scope::{manager_scope_satisfied, ownership_satisfied};
