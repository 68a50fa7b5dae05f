//! # Portal Authorization Runtime
//!
//! Session-scoped capability caching and navigation gating for the member
//! portal, built on the pure policy in `portal-rbac` and the role data model
//! in `portal-org`.
//!
//! ## Overview
//!
//! The portal-auth crate handles:
//! - **Capability context**: The session's role and capability set, swapped
//!   atomically on refresh, with stale refreshes discarded
//! - **Gate**: What a navigation renders (page, loading, forbidden, redirect)
//! - **Session**: Sign-in, organization switch and onboarding checks
//! - **Directory seam**: The async trait upstream lookups go through
//! - **Retry**: Per-attempt deadlines and exponential backoff for upstream calls
//! - **Configuration**: Runtime knobs loaded from the environment
//!
//! ## Failure model
//!
//! Upstream failures never surface as navigation errors. A role fetch that
//! fails or times out commits the unresolved role, which the gate denies
//! with "role not recognized". An onboarding check that fails counts as
//! "not completed".
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use portal_auth::{AuthResult, DirectoryService, GateConfig, Identity, RenderDirective, Session};
//! use portal_org::{AccessProfile, OnboardingState, OrganizationRecord};
//! use uuid::Uuid;
//!
//! struct FixedDirectory;
//!
//! #[async_trait]
//! impl DirectoryService for FixedDirectory {
//!     async fn fetch_access_profile(&self, _: &Identity, _: Option<Uuid>) -> AuthResult<AccessProfile> {
//!         Ok(AccessProfile::new()
//!             .with_organization(OrganizationRecord::new("Acme").with_access_role(123950004_i64)))
//!     }
//!
//!     async fn fetch_onboarding_state(&self, _: &str) -> AuthResult<OnboardingState> {
//!         Ok(OnboardingState::Completed)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let session = Session::new(Arc::new(FixedDirectory), GateConfig::default());
//! session.sign_in(Identity::new(Uuid::now_v7())).await.unwrap();
//!
//! assert!(session.navigate("/dashboard/documents").is_allowed());
//! assert_eq!(
//!     session.navigate("/dashboard/onboarding").directive,
//!     RenderDirective::Redirect("/dashboard/overview".to_string())
//! );
//! # }
//! ```

pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod gate;
pub mod retry;
pub mod session;

// Re-export main types for convenience
pub use config::{ConfigError, GateConfig};
pub use context::{CapabilityContext, CapabilitySnapshot, RefreshOutcome, RefreshTicket};
pub use directory::{DirectoryService, Identity};
pub use error::{AuthError, AuthResult};
pub use gate::{
    AuthorizationGate, DenialReason, GateDecision, GateInput, GateState, LoadingStage,
    NavigationRequest, RenderDirective,
};
pub use retry::{retry_upstream, RetryPolicy};
pub use session::Session;
