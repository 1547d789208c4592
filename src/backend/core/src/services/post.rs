//! Post management.
//!
//! Entity-level rules on top of the route policies: an author must exist
//! and be active before a post is accepted, modification follows the
//! strict reporting-line rule, and publishing stamps who published when.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::audit::{AuditAction, AuditEvent, AuditLevel, AuditSink};
use crate::error::{PalisadeError, Result};
use crate::rbac::{DenyReason, Principal, Resource, Role, UserId};
use crate::store::{PostFilter, PostRecord, PostStore, UserStore};

/// Payload for post creation. The caller is the author.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: String,
    pub content: String,
}

/// Payload for post updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Application service for the post entity.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    audit: Arc<dyn AuditSink>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            posts,
            users,
            audit,
        }
    }

    pub async fn list(&self, filter: &PostFilter) -> Result<Vec<PostRecord>> {
        self.posts.list(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<PostRecord> {
        self.posts
            .get(id)
            .await?
            .ok_or_else(|| PalisadeError::not_found("post", id))
    }

    pub async fn create(&self, principal: &Principal, input: CreatePost) -> Result<PostRecord> {
        let author_active = self
            .users
            .get(&principal.id)
            .await?
            .is_some_and(|author| author.is_active);
        if !author_active {
            return Err(PalisadeError::not_found("user", principal.id.as_str()));
        }

        let post = self
            .posts
            .insert(PostRecord::new(
                input.title,
                input.content,
                principal.id.clone(),
            ))
            .await?;

        info!(post_id = %post.id, author_id = post.author_id.as_str(), "post created");
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Info,
                    AuditAction::Create,
                    principal,
                    Resource::Post,
                    format!("created post {}", post.title),
                )
                .with_resource_id(&post.id),
            )
            .await;
        Ok(post)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        input: UpdatePost,
    ) -> Result<PostRecord> {
        let mut post = self.get(id).await?;
        self.check_can_modify(principal, &post).await?;

        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        post.updated_at = chrono::Utc::now();

        let post = self.posts.update(post).await?;
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Info,
                    AuditAction::Update,
                    principal,
                    Resource::Post,
                    format!("updated post {}", post.title),
                )
                .with_resource_id(&post.id),
            )
            .await;
        Ok(post)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let post = self.get(id).await?;
        self.check_can_modify(principal, &post).await?;

        self.posts.remove(id).await?;
        info!(post_id = id, "post deleted");
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Warning,
                    AuditAction::Delete,
                    principal,
                    Resource::Post,
                    format!("deleted post {}", post.title),
                )
                .with_resource_id(id),
            )
            .await;
        Ok(())
    }

    /// Mark a post published, stamping when and by whom. Re-publishing
    /// refreshes the stamp.
    pub async fn publish(&self, principal: &Principal, id: &str) -> Result<PostRecord> {
        let mut post = self.get(id).await?;

        match principal.role {
            Role::Admin => {}
            Role::Manager => {
                let author_manager = self.author_manager(&post.author_id).await?;
                if author_manager.as_ref() != Some(&principal.id) {
                    return Err(PalisadeError::denied(DenyReason::NotManagerOfTarget));
                }
            }
            Role::Operator => {
                return Err(PalisadeError::denied(DenyReason::InsufficientPermission));
            }
        }

        post.is_published = true;
        post.published_at = Some(chrono::Utc::now());
        post.published_by = Some(principal.id.clone());
        post.updated_at = chrono::Utc::now();

        let post = self.posts.update(post).await?;
        info!(post_id = %post.id, publisher = principal.id.as_str(), "post published");
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Info,
                    AuditAction::Publish,
                    principal,
                    Resource::Post,
                    format!("published post {}", post.title),
                )
                .with_resource_id(&post.id),
            )
            .await;
        Ok(post)
    }

    /// Admins may modify any post; managers only posts whose author
    /// reports to them; operators only their own.
    async fn check_can_modify(&self, principal: &Principal, post: &PostRecord) -> Result<()> {
        match principal.role {
            Role::Admin => Ok(()),
            Role::Manager => {
                let author_manager = self.author_manager(&post.author_id).await?;
                if author_manager.as_ref() == Some(&principal.id) {
                    Ok(())
                } else {
                    Err(PalisadeError::denied(DenyReason::NotManagerOfTarget))
                }
            }
            Role::Operator => {
                if post.author_id == principal.id {
                    Ok(())
                } else {
                    Err(PalisadeError::denied(DenyReason::NotOwner))
                }
            }
        }
    }

    async fn author_manager(&self, author_id: &UserId) -> Result<Option<UserId>> {
        Ok(self
            .users
            .get(author_id)
            .await?
            .and_then(|author| author.manager_id))
    }
}
