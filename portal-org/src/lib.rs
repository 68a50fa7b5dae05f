//! # Portal Organization Data
//!
//! Upstream data the portal authorizes against: organization and profile
//! records, the directory's access-role codes, onboarding status, and the
//! member's current organization selection.
//!
//! ## Overview
//!
//! The portal-org crate handles:
//! - **Access codes**: Directory role choice values and the raw role signal
//! - **Records**: Organization, profile and the combined access profile
//! - **Resolution**: Raw signal to effective role, with an audit trail
//! - **Onboarding**: Whether the organization has finished onboarding
//! - **Context**: The member's selected organization and recent history
//!
//! ## Architecture
//!
//! ```text
//! AccessProfile
//!   ├─ claimed role name ─┐
//!   ├─ ProfileRecord.access_role ─┼─→ RoleResolver ─→ EffectiveRole ─→ portal-rbac
//!   └─ OrganizationRecord.access_role ─┘
//!
//! SessionContext (current org) ─→ which AccessProfile to fetch
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use portal_org::{AccessProfile, OrganizationRecord, RoleResolver};
//! use portal_rbac::{EffectiveRole, Role};
//!
//! let profile = AccessProfile::new()
//!     .with_organization(OrganizationRecord::new("Acme").with_access_role("123,950,002"));
//!
//! let resolution = RoleResolver::resolve_profile(&profile, "example");
//! assert_eq!(resolution.role, EffectiveRole::Known(Role::Creator));
//! ```

pub mod access;
pub mod context;
pub mod onboarding;
pub mod organization;
pub mod resolver;

// Re-export main types for convenience
pub use access::{AccessRoleCode, RawRoleSignal};
pub use context::{SessionContext, MAX_RECENT_ORGANIZATIONS};
pub use onboarding::{OnboardingState, OnboardingStatus};
pub use organization::{AccessProfile, OrganizationRecord, ProfileRecord};
pub use resolver::{RoleResolution, RoleResolver, RoleSource, UnresolvedReason, AUDIT_TARGET};
