//! Organization and profile records
//!
//! This module provides the records the directory returns for a signed-in
//! identity. Each carries an `access_role` field holding the raw role signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::RawRoleSignal;

/// An organization as returned by the directory.
///
/// # Examples
///
/// ```
/// use portal_org::{OrganizationRecord, RawRoleSignal};
///
/// let org = OrganizationRecord::new("Acme Trading")
///     .with_account_id("acc-001")
///     .with_access_role(123950000_i64);
/// assert_eq!(org.access_role, RawRoleSignal::Integer(123950000));
/// assert_eq!(org.account_id.as_deref(), Some("acc-001"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationRecord {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Directory account id, used for the onboarding lookup
    #[serde(default)]
    pub account_id: Option<String>,

    /// Human-readable name
    pub name: String,

    /// Role of the current member within this organization
    #[serde(default)]
    pub access_role: RawRoleSignal,

    /// When the record was last fetched
    pub fetched_at: DateTime<Utc>,
}

impl OrganizationRecord {
    /// Creates a record with a fresh id and no role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id: None,
            name: name.into(),
            access_role: RawRoleSignal::Absent,
            fetched_at: Utc::now(),
        }
    }

    /// Set the directory account id.
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the raw role signal.
    pub fn with_access_role(mut self, signal: impl Into<RawRoleSignal>) -> Self {
        self.access_role = signal.into();
        self
    }
}

/// A member's own profile record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileRecord {
    /// Unique identifier for the profile
    pub id: Uuid,

    /// Display name
    pub display_name: String,

    /// Contact email
    #[serde(default)]
    pub email: Option<String>,

    /// Organization the profile is attached to, if known
    #[serde(default)]
    pub organization_id: Option<Uuid>,

    /// The member's role as stored on the profile
    #[serde(default)]
    pub access_role: RawRoleSignal,
}

impl ProfileRecord {
    /// Creates a profile with a fresh id and no role.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            display_name: display_name.into(),
            email: None,
            organization_id: None,
            access_role: RawRoleSignal::Absent,
        }
    }

    /// Set the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the raw role signal.
    pub fn with_access_role(mut self, signal: impl Into<RawRoleSignal>) -> Self {
        self.access_role = signal.into();
        self
    }
}

/// Everything the directory knows about an identity's access.
///
/// Role sources are consulted in this order: a role already claimed by the
/// identity provider, the profile's `access_role`, then the organization's.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccessProfile {
    /// Role name claimed by the identity provider, if any
    #[serde(default)]
    pub claimed_role: Option<String>,

    /// Profile record
    #[serde(default)]
    pub profile: Option<ProfileRecord>,

    /// Organization record
    #[serde(default)]
    pub organization: Option<OrganizationRecord>,
}

impl AccessProfile {
    /// Empty profile: resolves to unresolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the claimed role name.
    pub fn with_claimed_role(mut self, role: impl Into<String>) -> Self {
        self.claimed_role = Some(role.into());
        self
    }

    /// Attach a profile record.
    pub fn with_profile(mut self, profile: ProfileRecord) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Attach an organization record.
    pub fn with_organization(mut self, organization: OrganizationRecord) -> Self {
        self.organization = Some(organization);
        self
    }

    /// The organization's directory account id, if any.
    pub fn account_id(&self) -> Option<&str> {
        self.organization
            .as_ref()
            .and_then(|org| org.account_id.as_deref())
    }
}
