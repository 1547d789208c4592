//! `DashMap`-backed store.
//!
//! Concurrent, lock-free maps keyed by entity id. Suitable for a single
//! process; a database-backed implementation would plug in behind the
//! same traits.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{PalisadeError, Result};
use crate::rbac::{Resource, ResourceRef, UserId};

use super::{PostFilter, PostRecord, PostStore, ResourceLookup, UserFilter, UserRecord, UserStore};

/// In-process store holding users and posts.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: DashMap<String, UserRecord>,
    posts: DashMap<String, PostRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_matches(user: &UserRecord, filter: &UserFilter) -> bool {
        if filter.role.is_some_and(|r| user.role != r) {
            return false;
        }
        if let Some(manager_id) = &filter.manager_id {
            if user.manager_id.as_ref() != Some(manager_id) {
                return false;
            }
        }
        if filter.is_active.is_some_and(|a| user.is_active != a) {
            return false;
        }
        true
    }

    fn post_matches(&self, post: &PostRecord, filter: &PostFilter) -> bool {
        if let Some(author_id) = &filter.author_id {
            if post.author_id != *author_id {
                return false;
            }
        }
        if filter.is_published.is_some_and(|p| post.is_published != p) {
            return false;
        }
        if let Some(manager_id) = &filter.manager_id {
            let reports_to = self
                .users
                .get(post.author_id.as_str())
                .and_then(|author| author.manager_id.clone());
            if reports_to.as_ref() != Some(manager_id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.get(id.as_str()).map(|u| u.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn insert(&self, user: UserRecord) -> Result<UserRecord> {
        if self.users.contains_key(user.id.as_str()) {
            return Err(PalisadeError::duplicate(format!(
                "user {} already exists",
                user.id.as_str()
            )));
        }
        debug!(user_id = user.id.as_str(), username = %user.username, "user inserted");
        self.users.insert(user.id.as_str().to_string(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: UserRecord) -> Result<UserRecord> {
        if !self.users.contains_key(user.id.as_str()) {
            return Err(PalisadeError::not_found("user", user.id.as_str()));
        }
        self.users.insert(user.id.as_str().to_string(), user.clone());
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .users
            .iter()
            .filter(|u| Self::user_matches(u, filter))
            .map(|u| u.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self.posts.get(id).map(|p| p.clone()))
    }

    async fn insert(&self, post: PostRecord) -> Result<PostRecord> {
        if self.posts.contains_key(&post.id) {
            return Err(PalisadeError::duplicate(format!(
                "post {} already exists",
                post.id
            )));
        }
        debug!(post_id = %post.id, author_id = post.author_id.as_str(), "post inserted");
        self.posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn update(&self, post: PostRecord) -> Result<PostRecord> {
        if !self.posts.contains_key(&post.id) {
            return Err(PalisadeError::not_found("post", &post.id));
        }
        self.posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.posts.remove(id).is_some())
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<PostRecord>> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|p| self.post_matches(p, filter))
            .map(|p| p.clone())
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(posts)
    }
}

#[async_trait]
impl ResourceLookup for InMemoryStore {
    async fn resolve(&self, resource: Resource, id: &str) -> Result<Option<ResourceRef>> {
        match resource {
            Resource::User => Ok(self.users.get(id).map(|user| ResourceRef {
                owner_id: user.id.clone(),
                owner_manager_id: user.manager_id.clone(),
            })),
            Resource::Post => {
                let Some(post) = self.posts.get(id).map(|p| p.clone()) else {
                    return Ok(None);
                };
                // A post belongs to its author; the author's reporting line
                // supplies the manager scope.
                let manager_id = self
                    .users
                    .get(post.author_id.as_str())
                    .and_then(|author| author.manager_id.clone());
                Ok(Some(ResourceRef {
                    owner_id: post.author_id,
                    owner_manager_id: manager_id,
                }))
            }
            // Log entries have no owner; permission checks alone govern them.
            Resource::Log => Ok(None),
        }
    }
}
