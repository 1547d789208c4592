//! RBAC data models: roles, permissions, principals, and resource references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// The three roles known to the system.
///
/// Privilege ordering for delegation is admin > manager > operator, but
/// permission sets are explicit per role (see [`Role::permissions`]), not
/// inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "operator" => Ok(Self::Operator),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Returned when parsing a role string that is not one of the three roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

// ═══════════════════════════════════════════════════════════════════════════════
// Action and Resource
// ═══════════════════════════════════════════════════════════════════════════════

/// An action a principal may attempt on a resource type.
///
/// `Manage` is a wildcard: holding `manage` on a resource type satisfies a
/// check for any action on that resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
    Publish,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource types guarded by the authorization core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    User,
    Post,
    Log,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Post => "post",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

/// An (action, resource-type) pair, e.g. `create:post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub action: Action,
    pub resource: Resource,
}

impl Permission {
    pub const fn new(action: Action, resource: Resource) -> Self {
        Self { action, resource }
    }

    /// Check whether holding this permission satisfies a request for
    /// `action` on `resource`, honoring the `manage` wildcard.
    pub fn grants(&self, action: Action, resource: Resource) -> bool {
        self.resource == resource && (self.action == action || self.action == Action::Manage)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.resource)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The authenticated caller, as attached by the upstream authentication
/// step. The authorization core treats it as trusted, opaque input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Reference
// ═══════════════════════════════════════════════════════════════════════════════

/// The minimal shape the core needs about a target resource: who owns it
/// and who manages the owner. For a user resource the owner is the user
/// itself; for a post it is the author. Resolved by the calling layer; the
/// core never loads full entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub owner_id: UserId,
    pub owner_manager_id: Option<UserId>,
}

impl ResourceRef {
    pub fn owned_by(owner_id: impl Into<UserId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            owner_manager_id: None,
        }
    }

    pub fn managed_by(mut self, manager_id: impl Into<UserId>) -> Self {
        self.owner_manager_id = Some(manager_id.into());
        self
    }

    /// Reference to a resource that does not exist yet (user creation):
    /// only the claimed manager is known.
    pub fn prospective(manager_id: Option<UserId>) -> Self {
        Self {
            owner_id: UserId::new(""),
            owner_manager_id: manager_id,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a request was denied. Every check reports a specific reason; the
/// combinator never collapses reasons into a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NotAuthenticated,
    InsufficientPermission,
    NotOwner,
    NotManagerOfTarget,
    InvalidRoleAssignment,
    MalformedTargetReference,
    ResourceNotFound,
}

impl DenyReason {
    /// Wire-format name of this reason, matching the serde rename. Used
    /// as a metric label and in audit metadata.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::InsufficientPermission => "INSUFFICIENT_PERMISSION",
            Self::NotOwner => "NOT_OWNER",
            Self::NotManagerOfTarget => "NOT_MANAGER_OF_TARGET",
            Self::InvalidRoleAssignment => "INVALID_ROLE_ASSIGNMENT",
            Self::MalformedTargetReference => "MALFORMED_TARGET_REFERENCE",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
        }
    }

    /// Client-facing message for this denial.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Authentication is required",
            Self::InsufficientPermission => {
                "You do not have permission to perform this action"
            }
            Self::NotOwner => "You do not own this resource",
            Self::NotManagerOfTarget => "You are not the manager of this resource",
            Self::InvalidRoleAssignment => "Invalid role for this action",
            Self::MalformedTargetReference => "Invalid resource identifier",
            Self::ResourceNotFound => "Resource not found",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The outcome of evaluating a policy. Ephemeral, produced per request,
/// never stored by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
