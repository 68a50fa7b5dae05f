//! # Portal RBAC (Role-Based Access Control)
//!
//! Pure policy for the member portal: which capabilities each role holds,
//! and which capability each navigation path requires.
//!
//! ## Overview
//!
//! The portal-rbac crate handles:
//! - **Subjects**: Protected resource domains (documents, forms, onboarding, ...)
//! - **Actions**: Operations that can be performed on a subject
//! - **Capabilities**: Subject + Action pairs, collected into total allow/deny sets
//! - **Roles**: The canonical role set plus the distinguished unresolved role
//! - **Matrix**: Role to capability set, memoized per role
//! - **Routes**: Path to required capability, with exact, parameterized and prefix tiers
//!
//! ## Architecture
//!
//! ```text
//! Capability = Subject + Action
//!
//! Examples:
//!   "user-documents:read"     - Open the documents list
//!   "user-forms:create"       - Submit a service request form
//!   "onboarding:update"       - Continue the organization onboarding wizard
//! ```
//!
//! Nothing here performs I/O. Role resolution from upstream records lives in
//! `portal-org`; session caching and the navigation gate live in `portal-auth`.
//!
//! ## Usage
//!
//! ```rust
//! use portal_rbac::{Action, CapabilityMatrixBuilder, Role, RoutePermissionResolver, Subject};
//!
//! let caps = CapabilityMatrixBuilder::shared(Role::Creator.into());
//! assert!(caps.can(Action::Create, Subject::Documents));
//! assert!(!caps.can(Action::Delete, Subject::Documents));
//!
//! let resolver = RoutePermissionResolver::default();
//! let required = resolver.required_capability("/dashboard/documents").unwrap();
//! assert!(caps.allows(required));
//! ```

pub mod actions;
pub mod matrix;
pub mod permissions;
pub mod roles;
pub mod routes;
pub mod subjects;

// Re-export main types for convenience
pub use actions::Action;
pub use matrix::{CapabilityMatrixBuilder, PolicyRules, Rule};
pub use permissions::{Capability, CapabilitySet, Decision};
pub use roles::{EffectiveRole, Role};
pub use routes::{
    is_protected, normalize_path, resolve_required_capability, RouteMatch, RouteMatchTier,
    RoutePattern, RoutePermissionResolver, RouteTable,
};
pub use subjects::{Subject, SubjectArea};
