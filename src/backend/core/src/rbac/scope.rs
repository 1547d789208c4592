//! Scope resolution: ownership and delegated-management checks.
//!
//! Two deliberately distinct rules exist for "a manager acting on an
//! operator's resource":
//!
//! - [`ownership_satisfied`] is the coarse route-time gate: any manager
//!   passes it, mirroring the broad grant the policy applies to reads and
//!   generic access.
//! - [`manager_scope_satisfied`] is the strict rule used where delegation
//!   must be verified (publishing, user creation): the caller must be the
//!   recorded manager of the resource's owner.
//!
//! Both are total, pure functions; callers surface `false` as a denial.

use super::models::{Principal, ResourceRef, Role};

/// Ownership check.
///
/// - admin: unconditional pass (the only unconditional bypass).
/// - manager: pass, regardless of the target's owner.
/// - operator: pass only when the operator owns the resource.
pub fn ownership_satisfied(principal: &Principal, target: &ResourceRef) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Manager => true,
        Role::Operator => principal.id == target.owner_id,
    }
}

/// Manager-scope check (strict delegation rule).
///
/// - admin: pass.
/// - manager: pass only when the caller is the recorded manager of the
///   resource's owner. Delegation is one hop; there is no chain through
///   an operator's own reports, since operators have none.
/// - operator: never passes.
pub fn manager_scope_satisfied(principal: &Principal, target: &ResourceRef) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Manager => target
            .owner_manager_id
            .as_ref()
            .is_some_and(|manager_id| *manager_id == principal.id),
        Role::Operator => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
