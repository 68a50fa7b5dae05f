//! Session organization context
//!
//! This module provides the SessionContext type that tracks which
//! organization a signed-in member is currently working in. Switching
//! organization changes the role signal, so callers re-resolve the role
//! whenever [`SessionContext::switch_organization`] reports a change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of the recent-organizations list.
pub const MAX_RECENT_ORGANIZATIONS: usize = 10;

/// A member's current organization selection.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use portal_org::SessionContext;
///
/// let user_id = Uuid::now_v7();
/// let mut ctx = SessionContext::new(user_id);
///
/// let org_id = Uuid::now_v7();
/// assert!(ctx.switch_organization(org_id));
/// assert!(!ctx.switch_organization(org_id));
/// assert_eq!(ctx.current_organization_id, Some(org_id));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    /// User ID
    pub user_id: Uuid,

    /// Currently selected organization
    pub current_organization_id: Option<Uuid>,

    /// Recently accessed organizations (most recent first)
    #[serde(default)]
    pub recent_organizations: Vec<Uuid>,

    /// Default organization for new sessions
    pub default_organization_id: Option<Uuid>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl SessionContext {
    /// Creates a new context with no selected organization.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user ID this context belongs to
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_organization_id: None,
            recent_organizations: Vec::new(),
            default_organization_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Switch to a different organization.
    ///
    /// Moves the organization to the front of the recent list.
    ///
    /// # Returns
    ///
    /// `true` if the selection changed, meaning the role must be re-resolved
    pub fn switch_organization(&mut self, org_id: Uuid) -> bool {
        let changed = self.current_organization_id != Some(org_id);
        self.current_organization_id = Some(org_id);
        self.add_recent_organization(org_id);
        self.updated_at = Utc::now();
        changed
    }

    /// Set the default organization for this user.
    pub fn set_default_organization(&mut self, org_id: Uuid) {
        self.default_organization_id = Some(org_id);
        self.updated_at = Utc::now();
    }

    /// Clear the current organization (sign-out).
    pub fn clear_context(&mut self) {
        self.current_organization_id = None;
        self.updated_at = Utc::now();
    }

    /// The organization to act in: the current one, else the default.
    pub fn active_organization(&self) -> Option<Uuid> {
        self.current_organization_id.or(self.default_organization_id)
    }

    /// Get the most recent organizations.
    ///
    /// # Returns
    ///
    /// At most `limit` organization IDs, most recent first
    pub fn recent_organizations(&self, limit: usize) -> &[Uuid] {
        let end = limit.min(self.recent_organizations.len());
        &self.recent_organizations[..end]
    }

    fn add_recent_organization(&mut self, org_id: Uuid) {
        self.recent_organizations.retain(|id| *id != org_id);
        self.recent_organizations.insert(0, org_id);
        self.recent_organizations.truncate(MAX_RECENT_ORGANIZATIONS);
    }
}
