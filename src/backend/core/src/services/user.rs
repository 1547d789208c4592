//! User management.
//!
//! The middleware already gated the route on a policy; the service applies
//! the stricter entity-level rules that need the full stored record: role
//! assignment reach, username uniqueness, manager reference validity, and
//! the exact-match modification rule.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::audit::{AuditAction, AuditEvent, AuditLevel, AuditSink};
use crate::error::{PalisadeError, Result};
use crate::rbac::{DenyReason, Principal, Resource, Role, UserId};
use crate::store::{UserFilter, UserRecord, UserStore};

/// Payload for user creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
}

/// Payload for user updates. Role is fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub username: Option<String>,
    pub is_active: Option<bool>,
    pub manager_id: Option<UserId>,
}

/// Application service for the user entity.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    audit: Arc<dyn AuditSink>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        self.store.list(filter).await
    }

    pub async fn get(&self, id: &UserId) -> Result<UserRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PalisadeError::not_found("user", id.as_str()))
    }

    pub async fn create(&self, principal: &Principal, input: CreateUser) -> Result<UserRecord> {
        if !principal.role.can_assign(input.role) {
            return Err(PalisadeError::denied(DenyReason::InvalidRoleAssignment));
        }

        if self
            .store
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(PalisadeError::duplicate("Username already exists"));
        }

        if let Some(manager_id) = &input.manager_id {
            self.require_manager(manager_id).await?;
        }

        let user = self
            .store
            .insert(UserRecord::new(input.username, input.role, input.manager_id))
            .await?;

        info!(user_id = user.id.as_str(), role = %user.role, "user created");
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Info,
                    AuditAction::Create,
                    principal,
                    Resource::User,
                    format!("created user {}", user.username),
                )
                .with_resource_id(user.id.as_str()),
            )
            .await;
        Ok(user)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &UserId,
        input: UpdateUser,
    ) -> Result<UserRecord> {
        let mut user = self.get(id).await?;
        self.check_can_modify(principal, &user)?;

        if let Some(manager_id) = &input.manager_id {
            self.require_manager(manager_id).await?;
        }
        if let Some(username) = &input.username {
            let taken = self
                .store
                .find_by_username(username)
                .await?
                .is_some_and(|existing| existing.id != user.id);
            if taken {
                return Err(PalisadeError::duplicate("Username already exists"));
            }
        }

        if let Some(username) = input.username {
            user.username = username;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        if let Some(manager_id) = input.manager_id {
            user.manager_id = Some(manager_id);
        }
        user.updated_at = chrono::Utc::now();

        let user = self.store.update(user).await?;
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Info,
                    AuditAction::Update,
                    principal,
                    Resource::User,
                    format!("updated user {}", user.username),
                )
                .with_resource_id(user.id.as_str()),
            )
            .await;
        Ok(user)
    }

    /// Deactivate a user. Records are kept; nothing is removed.
    pub async fn delete(&self, principal: &Principal, id: &UserId) -> Result<()> {
        let mut user = self.get(id).await?;
        self.check_can_modify(principal, &user)?;

        user.is_active = false;
        user.updated_at = chrono::Utc::now();
        self.store.update(user.clone()).await?;

        info!(user_id = user.id.as_str(), "user deactivated");
        self.audit
            .record(
                AuditEvent::new(
                    AuditLevel::Warning,
                    AuditAction::Delete,
                    principal,
                    Resource::User,
                    format!("deactivated user {}", user.username),
                )
                .with_resource_id(user.id.as_str()),
            )
            .await;
        Ok(())
    }

    /// Admins may modify anyone; managers only operators who report to
    /// them; operators only themselves.
    fn check_can_modify(&self, principal: &Principal, target: &UserRecord) -> Result<()> {
        match principal.role {
            Role::Admin => Ok(()),
            Role::Manager => {
                let manages = target.role == Role::Operator
                    && target.manager_id.as_ref() == Some(&principal.id);
                if manages {
                    Ok(())
                } else {
                    Err(PalisadeError::denied(DenyReason::NotManagerOfTarget))
                }
            }
            Role::Operator => {
                if target.id == principal.id {
                    Ok(())
                } else {
                    Err(PalisadeError::denied(DenyReason::NotOwner))
                }
            }
        }
    }

    async fn require_manager(&self, manager_id: &UserId) -> Result<()> {
        let is_manager = self
            .store
            .get(manager_id)
            .await?
            .is_some_and(|m| m.role == Role::Manager);
        if is_manager {
            Ok(())
        } else {
            Err(PalisadeError::validation("Invalid manager ID"))
        }
    }
}
