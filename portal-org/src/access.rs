//! Directory access-role codes
//!
//! The directory stores an organization member's role as a numeric choice
//! value. This module names those values and models the untrusted signal
//! that carries them.

use portal_rbac::Role;
use serde::{Deserialize, Serialize};

/// Role choice values known to the directory.
///
/// `Contributor` is a real directory role that the portal does not admit:
/// it has no canonical [`Role`] and resolves to unresolved.
///
/// # Examples
///
/// ```
/// use portal_org::AccessRoleCode;
/// use portal_rbac::Role;
///
/// let code = AccessRoleCode::from_code(123_950_003).unwrap();
/// assert_eq!(code, AccessRoleCode::Approver);
/// assert_eq!(code.canonical(), Some(Role::Approver));
///
/// assert_eq!(AccessRoleCode::Contributor.canonical(), None);
/// assert_eq!(AccessRoleCode::for_role(Role::Admin).code(), 123_950_000);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessRoleCode {
    /// 123950000
    Admin,
    /// 123950001
    Contributor,
    /// 123950002
    Creator,
    /// 123950003
    Approver,
    /// 123950004
    Viewer,
}

impl AccessRoleCode {
    /// Admin choice value.
    pub const ADMIN: i64 = 123_950_000;
    /// Contributor choice value.
    pub const CONTRIBUTOR: i64 = 123_950_001;
    /// Creator choice value.
    pub const CREATOR: i64 = 123_950_002;
    /// Approver choice value.
    pub const APPROVER: i64 = 123_950_003;
    /// Viewer choice value.
    pub const VIEWER: i64 = 123_950_004;

    /// Every known code.
    pub const ALL: [AccessRoleCode; 5] = [
        AccessRoleCode::Admin,
        AccessRoleCode::Contributor,
        AccessRoleCode::Creator,
        AccessRoleCode::Approver,
        AccessRoleCode::Viewer,
    ];

    /// Look up a numeric choice value.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::ADMIN => Some(Self::Admin),
            Self::CONTRIBUTOR => Some(Self::Contributor),
            Self::CREATOR => Some(Self::Creator),
            Self::APPROVER => Some(Self::Approver),
            Self::VIEWER => Some(Self::Viewer),
            _ => None,
        }
    }

    /// The numeric choice value.
    pub fn code(&self) -> i64 {
        match self {
            Self::Admin => Self::ADMIN,
            Self::Contributor => Self::CONTRIBUTOR,
            Self::Creator => Self::CREATOR,
            Self::Approver => Self::APPROVER,
            Self::Viewer => Self::VIEWER,
        }
    }

    /// Get string representation of the directory role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contributor => "contributor",
            Self::Creator => "creator",
            Self::Approver => "approver",
            Self::Viewer => "viewer",
        }
    }

    /// Get a human-readable display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Contributor => "Contributor",
            Self::Creator => "Creator",
            Self::Approver => "Approver",
            Self::Viewer => "Viewer",
        }
    }

    /// The canonical role, or `None` when the portal does not admit it.
    pub fn canonical(&self) -> Option<Role> {
        match self {
            Self::Admin => Some(Role::Admin),
            Self::Creator => Some(Role::Creator),
            Self::Approver => Some(Role::Approver),
            Self::Viewer => Some(Role::Viewer),
            Self::Contributor => None,
        }
    }

    /// Reverse lookup, used when writing a role back to the directory.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Creator => Self::Creator,
            Role::Approver => Self::Approver,
            Role::Viewer => Self::Viewer,
        }
    }
}

impl std::fmt::Display for AccessRoleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// The role field as it arrives from the directory.
///
/// Untrusted: a number, a numeric string (possibly with thousands
/// separators), or nothing at all. Never consulted directly by a
/// permission check; see [`RoleResolver`](crate::RoleResolver).
///
/// # Examples
///
/// ```
/// use portal_org::RawRoleSignal;
///
/// let from_number: RawRoleSignal = serde_json::from_str("123950000").unwrap();
/// let from_text: RawRoleSignal = serde_json::from_str("\"123,950,000\"").unwrap();
/// let missing: RawRoleSignal = serde_json::from_str("null").unwrap();
///
/// assert_eq!(from_number, RawRoleSignal::Integer(123950000));
/// assert_eq!(from_text, RawRoleSignal::Text("123,950,000".to_string()));
/// assert!(missing.is_absent());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RawRoleSignal {
    /// Numeric choice value.
    Integer(i64),
    /// Textual choice value.
    Text(String),
    /// Field missing or null.
    #[default]
    Absent,
}

impl RawRoleSignal {
    /// Check if no value was supplied. Blank text counts as absent.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Integer(_) => false,
        }
    }
}

impl From<i64> for RawRoleSignal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawRoleSignal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawRoleSignal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<RawRoleSignal>> From<Option<T>> for RawRoleSignal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl std::fmt::Display for RawRoleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) if !text.trim().is_empty() => write!(f, "{text:?}"),
            _ => f.write_str("N/A"),
        }
    }
}
