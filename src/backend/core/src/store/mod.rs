//! Storage collaborators.
//!
//! The authorization core and the services talk to storage through narrow
//! trait contracts so implementations can be swapped for test doubles.
//! [`ResourceLookup`] is the only contract the authorization middleware
//! itself consumes: it resolves a resource id to the two-field
//! [`ResourceRef`] shape without exposing full entities to the core.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rbac::{Resource, ResourceRef, Role, UserId};

pub use memory::InMemoryStore;

// ═══════════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    /// The manager this user reports to. Always `None` for admins and
    /// managers without a reporting line; set for operators.
    pub manager_id: Option<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, role: Role, manager_id: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(uuid::Uuid::new_v4().to_string()),
            username: username.into(),
            role,
            manager_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub published_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            author_id,
            is_published: false,
            published_at: None,
            published_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filters
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter for user listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<Role>,
    pub manager_id: Option<UserId>,
    pub is_active: Option<bool>,
}

/// Filter for post listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    pub author_id: Option<UserId>,
    pub is_published: Option<bool>,
    /// Restrict to posts authored by operators reporting to this manager.
    pub manager_id: Option<UserId>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Contracts
// ═══════════════════════════════════════════════════════════════════════════════

/// User persistence contract.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    async fn insert(&self, user: UserRecord) -> Result<UserRecord>;
    async fn update(&self, user: UserRecord) -> Result<UserRecord>;
    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserRecord>>;
}

/// Post persistence contract.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    async fn insert(&self, post: PostRecord) -> Result<PostRecord>;
    async fn update(&self, post: PostRecord) -> Result<PostRecord>;
    async fn remove(&self, id: &str) -> Result<bool>;
    async fn list(&self, filter: &PostFilter) -> Result<Vec<PostRecord>>;
}

/// Resolve a target resource id to the minimal ownership shape the
/// authorization core needs. `Ok(None)` means the resource does not
/// exist; the middleware reports that as a `ResourceNotFound` denial.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn resolve(&self, resource: Resource, id: &str) -> Result<Option<ResourceRef>>;
}
