//! Directory service seam
//!
//! The portal learns a member's role and onboarding status from an external
//! directory. This module defines the signed-in [`Identity`] and the async
//! [`DirectoryService`] trait the session calls; transports live with the
//! application.

use async_trait::async_trait;
use portal_org::{AccessProfile, OnboardingState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthResult;

/// An authenticated identity.
///
/// # Examples
///
/// ```
/// use portal_auth::Identity;
/// use uuid::Uuid;
///
/// let identity = Identity::new(Uuid::now_v7()).with_email("dana@example.com");
/// assert_eq!(identity.email.as_deref(), Some("dana@example.com"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// User ID from the identity provider
    pub user_id: Uuid,

    /// Email address, if released by the provider
    #[serde(default)]
    pub email: Option<String>,

    /// Role name claimed by the provider's token, if any
    #[serde(default)]
    pub claimed_role: Option<String>,
}

impl Identity {
    /// Creates an identity with no email or claimed role.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            claimed_role: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the claimed role name.
    pub fn with_claimed_role(mut self, role: impl Into<String>) -> Self {
        self.claimed_role = Some(role.into());
        self
    }
}

/// Upstream lookups the session depends on.
///
/// Implementations report transport problems as
/// [`AuthError::DirectoryUnavailable`](crate::AuthError::DirectoryUnavailable)
/// or [`AuthError::Upstream`](crate::AuthError::Upstream) so the retry
/// policy can tell transient failures from permanent ones.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Fetch the access profile for `identity` within an organization.
    ///
    /// `organization_id` is `None` when the member has not picked one; the
    /// directory then answers for the member's default organization.
    async fn fetch_access_profile(
        &self,
        identity: &Identity,
        organization_id: Option<Uuid>,
    ) -> AuthResult<AccessProfile>;

    /// Fetch the onboarding state for a directory account.
    ///
    /// A missing record should be reported as
    /// [`AuthError::NotFound`](crate::AuthError::NotFound) or as
    /// [`OnboardingState::NotCompleted`].
    async fn fetch_onboarding_state(&self, account_id: &str) -> AuthResult<OnboardingState>;
}
