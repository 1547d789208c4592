//! The static role-permission table and the role-assignment hierarchy.
//!
//! Both tables are fixed data, defined once, never persisted or mutated at
//! runtime:
//!
//! | Role     | Permissions                                                  |
//! |----------|--------------------------------------------------------------|
//! | Admin    | manage:user, manage:post, read:log                           |
//! | Manager  | create:user, read:user, update:user, manage:post, publish:post |
//! | Operator | read:user, create:post, read:post, update:post, delete:post  |

use super::models::{Action, Permission, Resource, Role};

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::new(Action::Manage, Resource::User),
    Permission::new(Action::Manage, Resource::Post),
    Permission::new(Action::Read, Resource::Log),
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::new(Action::Create, Resource::User),
    Permission::new(Action::Read, Resource::User),
    Permission::new(Action::Update, Resource::User),
    Permission::new(Action::Manage, Resource::Post),
    Permission::new(Action::Publish, Resource::Post),
];

const OPERATOR_PERMISSIONS: &[Permission] = &[
    Permission::new(Action::Read, Resource::User),
    Permission::new(Action::Create, Resource::Post),
    Permission::new(Action::Read, Resource::Post),
    Permission::new(Action::Update, Resource::Post),
    Permission::new(Action::Delete, Resource::Post),
];

impl Role {
    /// The permission set for this role. Total: every role has a non-empty
    /// set.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::Admin => ADMIN_PERMISSIONS,
            Self::Manager => MANAGER_PERMISSIONS,
            Self::Operator => OPERATOR_PERMISSIONS,
        }
    }

    /// Permission evaluator: may this role perform `action` on `resource`?
    ///
    /// Deterministic and side-effect free; `manage` on a resource type
    /// satisfies any action on it.
    pub fn is_allowed(&self, action: Action, resource: Resource) -> bool {
        self.permissions()
            .iter()
            .any(|perm| perm.grants(action, resource))
    }

    /// Roles this role may assign when creating a user: admin may create
    /// managers and operators, a manager may create operators, an operator
    /// may create nobody.
    pub fn assignable_roles(&self) -> &'static [Role] {
        match self {
            Self::Admin => &[Role::Manager, Role::Operator],
            Self::Manager => &[Role::Operator],
            Self::Operator => &[],
        }
    }

    /// Role-assignment rule used by the user-creation flow.
    pub fn can_assign(&self, target: Role) -> bool {
        self.assignable_roles().contains(&target)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
