//! Canonical application roles
//!
//! This module defines the closed set of roles the capability matrix
//! understands, plus the distinguished unresolved role.

use serde::{Deserialize, Serialize};

/// Canonical application role.
///
/// # Permission Model
///
/// - **Admin**: Full dashboard access, delete rights and onboarding
/// - **Creator**: Create and edit dashboard content, no delete, no onboarding
/// - **Approver**: Same shape as Creator
/// - **Viewer**: Read-only, plus self-service profile updates
///
/// # Examples
///
/// ```
/// use portal_rbac::Role;
///
/// assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
/// assert_eq!(Role::Viewer.label(), "Viewer");
/// assert_eq!(Role::parse("contributor"), None);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Organization administrator
    Admin,

    /// Can create and edit content
    Creator,

    /// Can create and edit content; signs off requests
    Approver,

    /// Read-only access
    Viewer,
}

impl Role {
    /// Every canonical role. This is the allowed set; nothing else may
    /// reach the capability matrix as a valid role.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Creator, Role::Approver, Role::Viewer];

    /// Parse role from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "creator" => Some(Self::Creator),
            "approver" => Some(Self::Approver),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Creator => "creator",
            Self::Approver => "approver",
            Self::Viewer => "viewer",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Creator => "Creator",
            Self::Approver => "Approver",
            Self::Viewer => "Viewer",
        }
    }

    /// Check if this role is the administrator.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role the capability matrix is evaluated for.
///
/// `Unresolved` is not a member of [`Role`]: it is strictly more
/// restricted than [`Role::Viewer`] and must never be conflated with it.
///
/// # Examples
///
/// ```
/// use portal_rbac::{EffectiveRole, Role};
///
/// let role = EffectiveRole::from(Some(Role::Viewer));
/// assert_eq!(role.role(), Some(Role::Viewer));
///
/// let unknown = EffectiveRole::from(None);
/// assert!(!unknown.is_resolved());
/// assert_eq!(unknown.as_str(), "unresolved");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveRole {
    /// A canonical role.
    Known(Role),
    /// No valid role could be determined.
    Unresolved,
}

impl EffectiveRole {
    /// All effective roles, the unresolved role last.
    pub const ALL: [EffectiveRole; 5] = [
        EffectiveRole::Known(Role::Admin),
        EffectiveRole::Known(Role::Creator),
        EffectiveRole::Known(Role::Approver),
        EffectiveRole::Known(Role::Viewer),
        EffectiveRole::Unresolved,
    ];

    /// The canonical role, if resolved.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Known(role) => Some(*role),
            Self::Unresolved => None,
        }
    }

    /// Check if a canonical role was resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Check if this is the admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Known(Role::Admin))
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Known(role) => role.as_str(),
            Self::Unresolved => "unresolved",
        }
    }

    /// Dense index used for per-role memo tables.
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Known(Role::Admin) => 0,
            Self::Known(Role::Creator) => 1,
            Self::Known(Role::Approver) => 2,
            Self::Known(Role::Viewer) => 3,
            Self::Unresolved => 4,
        }
    }
}

impl From<Role> for EffectiveRole {
    fn from(role: Role) -> Self {
        Self::Known(role)
    }
}

impl From<Option<Role>> for EffectiveRole {
    fn from(role: Option<Role>) -> Self {
        role.map_or(Self::Unresolved, Self::Known)
    }
}

impl std::fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
