//! Access policies: ordered check lists evaluated with early exit.
//!
//! A [`Check`] is a pure predicate over the caller and the decision
//! context. An [`AccessPolicy`] sequences checks in declaration order and
//! short-circuits on the first failure, propagating that check's specific
//! [`DenyReason`] unchanged. Later checks may therefore assume the
//! preconditions earlier checks established.

use tracing::debug;

use super::models::{
    AccessDecision, Action, DenyReason, Principal, Resource, ResourceRef,
};
use super::scope;

// ═══════════════════════════════════════════════════════════════════════════════
// Decision Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a check may inspect for one request: the attempted action,
/// the resource type, and the resolved target reference (absent for
/// operations without a concrete target, such as list or create-post).
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub action: Action,
    pub resource: Resource,
    pub target: Option<ResourceRef>,
}

impl AccessContext {
    pub fn new(action: Action, resource: Resource) -> Self {
        Self {
            action,
            resource,
            target: None,
        }
    }

    pub fn with_target(mut self, target: ResourceRef) -> Self {
        self.target = Some(target);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Check
// ═══════════════════════════════════════════════════════════════════════════════

type CheckFn = dyn Fn(&Principal, &AccessContext) -> Result<(), DenyReason> + Send + Sync;

/// A single named authorization check.
pub struct Check {
    name: &'static str,
    predicate: Box<CheckFn>,
}

impl Check {
    pub fn new<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&Principal, &AccessContext) -> Result<(), DenyReason> + Send + Sync + 'static,
    {
        Self {
            name,
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Require the caller's role to hold `action` on `resource` in the
    /// role-permission table.
    pub fn permission(action: Action, resource: Resource) -> Self {
        Self::new("permission", move |principal, _ctx| {
            if principal.role.is_allowed(action, resource) {
                Ok(())
            } else {
                Err(DenyReason::InsufficientPermission)
            }
        })
    }

    /// Require the caller to satisfy the (coarse) ownership rule for the
    /// target. A missing target reference is a malformed request, for
    /// every role.
    pub fn ownership() -> Self {
        Self::new("ownership", |principal, ctx| {
            let target = ctx
                .target
                .as_ref()
                .ok_or(DenyReason::MalformedTargetReference)?;
            if scope::ownership_satisfied(principal, target) {
                Ok(())
            } else {
                Err(DenyReason::NotOwner)
            }
        })
    }

    /// Require the caller to satisfy the strict manager-scope rule for the
    /// target. Admins pass before the target is even consulted; managers
    /// without a target reference get a malformed-request denial.
    pub fn manager_scope() -> Self {
        Self::new("manager_scope", |principal, ctx| {
            use crate::rbac::models::Role;
            match principal.role {
                Role::Admin => Ok(()),
                Role::Manager => {
                    let target = ctx
                        .target
                        .as_ref()
                        .ok_or(DenyReason::MalformedTargetReference)?;
                    if scope::manager_scope_satisfied(principal, target) {
                        Ok(())
                    } else {
                        Err(DenyReason::NotManagerOfTarget)
                    }
                }
                Role::Operator => Err(DenyReason::NotManagerOfTarget),
            }
        })
    }

    pub fn evaluate(
        &self,
        principal: &Principal,
        ctx: &AccessContext,
    ) -> Result<(), DenyReason> {
        (self.predicate)(principal, ctx)
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Policy (check combinator)
// ═══════════════════════════════════════════════════════════════════════════════

/// A named, ordered list of checks guarding one operation.
#[derive(Debug)]
pub struct AccessPolicy {
    name: &'static str,
    action: Action,
    resource: Resource,
    checks: Vec<Check>,
}

impl AccessPolicy {
    /// Combine checks into a policy. An empty check list is a
    /// programming-time contract violation, not a runtime condition.
    pub fn combine(
        name: &'static str,
        action: Action,
        resource: Resource,
        checks: Vec<Check>,
    ) -> Self {
        debug_assert!(!checks.is_empty(), "policy {name} has no checks");
        Self {
            name,
            action,
            resource,
            checks,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Evaluate the checks strictly in declaration order, aborting on the
    /// first failure and reporting that check's reason.
    pub fn evaluate(&self, principal: &Principal, ctx: &AccessContext) -> AccessDecision {
        for check in &self.checks {
            if let Err(reason) = check.evaluate(principal, ctx) {
                debug!(
                    policy = self.name,
                    check = check.name(),
                    user_id = %principal.id,
                    role = %principal.role,
                    %reason,
                    "access denied"
                );
                return AccessDecision::Deny(reason);
            }
        }
        AccessDecision::Allow
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Named policies for the guarded operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Permission-only gate, used for list/get routes.
    pub fn require_permission(
        name: &'static str,
        action: Action,
        resource: Resource,
    ) -> Self {
        Self::combine(name, action, resource, vec![Check::permission(action, resource)])
    }

    pub fn list_users() -> Self {
        Self::require_permission("list-users", Action::Read, Resource::User)
    }

    pub fn get_user() -> Self {
        Self::require_permission("get-user", Action::Read, Resource::User)
    }

    /// Create a user: the creator needs `create:user` and, unless admin,
    /// must be the claimed manager of the new user.
    pub fn create_user() -> Self {
        Self::combine(
            "create-user",
            Action::Create,
            Resource::User,
            vec![
                Check::permission(Action::Create, Resource::User),
                Check::manager_scope(),
            ],
        )
    }

    pub fn update_user() -> Self {
        Self::combine(
            "update-user",
            Action::Update,
            Resource::User,
            vec![
                Check::permission(Action::Update, Resource::User),
                Check::ownership(),
            ],
        )
    }

    pub fn delete_user() -> Self {
        Self::combine(
            "delete-user",
            Action::Delete,
            Resource::User,
            vec![
                Check::permission(Action::Delete, Resource::User),
                Check::ownership(),
            ],
        )
    }

    pub fn list_posts() -> Self {
        Self::require_permission("list-posts", Action::Read, Resource::Post)
    }

    pub fn get_post() -> Self {
        Self::require_permission("get-post", Action::Read, Resource::Post)
    }

    pub fn create_post() -> Self {
        Self::require_permission("create-post", Action::Create, Resource::Post)
    }

    pub fn update_post() -> Self {
        Self::combine(
            "update-post",
            Action::Update,
            Resource::Post,
            vec![
                Check::permission(Action::Update, Resource::Post),
                Check::ownership(),
            ],
        )
    }

    pub fn delete_post() -> Self {
        Self::combine(
            "delete-post",
            Action::Delete,
            Resource::Post,
            vec![
                Check::permission(Action::Delete, Resource::Post),
                Check::ownership(),
            ],
        )
    }

    /// Publish a post: needs `publish:post` and the strict manager-scope
    /// rule against the post's author.
    pub fn publish_post() -> Self {
        Self::combine(
            "publish-post",
            Action::Publish,
            Resource::Post,
            vec![
                Check::permission(Action::Publish, Resource::Post),
                Check::manager_scope(),
            ],
        )
    }

    pub fn read_logs() -> Self {
        Self::require_permission("read-logs", Action::Read, Resource::Log)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ctx(action: Action, resource: Resource) -> AccessContext {
        AccessContext::new(action, resource)
    }

    #[test]
    fn test_short_circuit_skips_later_checks() {
        let ran = Arc::new(AtomicUsize::new(0));
        let marker = ran.clone();
        let policy = AccessPolicy::combine(
            "test",
            Action::Update,
            Resource::Post,
            vec![
                Check::new("always-fails", |_, _| Err(DenyReason::NotOwner)),
                Check::new("never-runs", move |_, _| {
                    marker.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            ],
        );

        let operator = Principal::new("o1", Role::Operator);
        let decision = policy.evaluate(&operator, &ctx(Action::Update, Resource::Post));

        // The first failure's reason propagates, and the second check's
        // side-effect marker was never incremented.
        assert_eq!(decision, AccessDecision::Deny(DenyReason::NotOwner));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_checks_pass_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        let policy = AccessPolicy::combine(
            "test",
            Action::Read,
            Resource::Post,
            vec![
                Check::new("first", move |_, _| {
                    first.lock().unwrap().push(1);
                    Ok(())
                }),
                Check::new("second", move |_, _| {
                    second.lock().unwrap().push(2);
                    Ok(())
                }),
            ],
        );

        let admin = Principal::new("a1", Role::Admin);
        assert!(policy
            .evaluate(&admin, &ctx(Action::Read, Resource::Post))
            .is_allowed());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_specific_reason_is_preserved() {
        let policy = AccessPolicy::update_post();
        let stranger = Principal::new("o2", Role::Operator);
        let context = ctx(Action::Update, Resource::Post)
            .with_target(ResourceRef::owned_by("o1").managed_by("m1"));

        // Permission passes (operator holds update:post), ownership fails.
        assert_eq!(
            policy.evaluate(&stranger, &context),
            AccessDecision::Deny(DenyReason::NotOwner)
        );

        // A manager without publish scope gets the manager-scope reason,
        // not a generic one.
        let foreign_manager = Principal::new("m2", Role::Manager);
        assert_eq!(
            AccessPolicy::publish_post().evaluate(&foreign_manager, &context),
            AccessDecision::Deny(DenyReason::NotManagerOfTarget)
        );
    }

    #[test]
    fn test_update_post_owner_allowed() {
        let policy = AccessPolicy::update_post();
        let author = Principal::new("o1", Role::Operator);
        let context = ctx(Action::Update, Resource::Post)
            .with_target(ResourceRef::owned_by("o1").managed_by("m1"));
        assert!(policy.evaluate(&author, &context).is_allowed());
    }

    #[test]
    fn test_publish_post_manager_of_author() {
        let policy = AccessPolicy::publish_post();
        let manager = Principal::new("m1", Role::Manager);
        let context = ctx(Action::Publish, Resource::Post)
            .with_target(ResourceRef::owned_by("o1").managed_by("m1"));
        assert!(policy.evaluate(&manager, &context).is_allowed());

        let author = Principal::new("o1", Role::Operator);
        // Operators fail the permission check first: publish:post is not
        // in their set.
        assert_eq!(
            policy.evaluate(&author, &context),
            AccessDecision::Deny(DenyReason::InsufficientPermission)
        );
    }

    #[test]
    fn test_create_user_manager_scope() {
        let policy = AccessPolicy::create_user();

        // Admin creating a manager: no target reference needed.
        let admin = Principal::new("a1", Role::Admin);
        assert!(policy
            .evaluate(&admin, &ctx(Action::Create, Resource::User))
            .is_allowed());

        // Manager claiming themselves as the new operator's manager.
        let manager = Principal::new("m1", Role::Manager);
        let claimed = ctx(Action::Create, Resource::User)
            .with_target(ResourceRef::prospective(Some("m1".into())));
        assert!(policy.evaluate(&manager, &claimed).is_allowed());

        // Manager omitting the manager id: malformed request.
        assert_eq!(
            policy.evaluate(&manager, &ctx(Action::Create, Resource::User)),
            AccessDecision::Deny(DenyReason::MalformedTargetReference)
        );

        // Operator fails the permission check before scope is consulted.
        let operator = Principal::new("o1", Role::Operator);
        assert_eq!(
            policy.evaluate(&operator, &ctx(Action::Create, Resource::User)),
            AccessDecision::Deny(DenyReason::InsufficientPermission)
        );
    }

    #[test]
    fn test_ownership_missing_target_is_malformed() {
        let policy = AccessPolicy::update_user();
        let admin = Principal::new("a1", Role::Admin);
        assert_eq!(
            policy.evaluate(&admin, &ctx(Action::Update, Resource::User)),
            AccessDecision::Deny(DenyReason::MalformedTargetReference)
        );
    }

    #[test]
    #[should_panic(expected = "has no checks")]
    #[cfg(debug_assertions)]
    fn test_empty_policy_fails_fast() {
        let _ = AccessPolicy::combine("empty", Action::Read, Resource::Log, vec![]);
    }
}
