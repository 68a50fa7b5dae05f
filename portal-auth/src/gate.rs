//! Navigation authorization gate
//!
//! [`AuthorizationGate`] decides what a navigation renders: the page, a
//! loading indicator, a forbidden notice, or a redirect. It is pure over its
//! inputs; the caller supplies whether an identity is present, the current
//! [`CapabilitySnapshot`] and the onboarding state.
//!
//! Evaluation order:
//!
//! 1. No identity: wait for sign-in.
//! 2. Role still loading: wait for the role.
//! 3. Unresolved role: denied, "role not recognized".
//! 4. Onboarding area (skipped for explicit overrides): admin-only while
//!    onboarding is incomplete, everyone else goes to the landing route.
//! 5. Onboarding-first redirect, when configured.
//! 6. Required capability from the override or the route table; none means
//!    allowed.
//! 7. Capability lookup: allowed or "insufficient privilege".

use portal_org::OnboardingState;
use portal_rbac::{normalize_path, Action, Capability, RoutePermissionResolver, Subject};
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::context::CapabilitySnapshot;

/// Where a navigation is in the gate's state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// No authenticated session yet
    AwaitingIdentity,
    /// Signed in, role not produced yet
    AwaitingRole,
    /// Role known, waiting on a dependent check
    Evaluating,
    /// Render the page
    Allowed,
    /// Render a forbidden notice
    Denied,
    /// Sent somewhere else before the capability check
    RedirectedSpecialCase,
}

impl GateState {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::AwaitingIdentity => "awaiting_identity",
            GateState::AwaitingRole => "awaiting_role",
            GateState::Evaluating => "evaluating",
            GateState::Allowed => "allowed",
            GateState::Denied => "denied",
            GateState::RedirectedSpecialCase => "redirected_special_case",
        }
    }

    /// Check if the gate reached a decision.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GateState::Allowed | GateState::Denied | GateState::RedirectedSpecialCase
        )
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a loading indicator is waiting for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStage {
    /// Sign-in
    Auth,
    /// Organization role lookup
    Organization,
    /// Onboarding status check
    Onboarding,
}

impl LoadingStage {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadingStage::Auth => "auth",
            LoadingStage::Organization => "organization",
            LoadingStage::Onboarding => "onboarding",
        }
    }
}

/// Why a navigation was denied.
///
/// # Example
///
/// ```
/// use portal_auth::DenialReason;
/// use portal_rbac::{Action, Capability, Subject};
///
/// let reason = DenialReason::InsufficientPrivilege(Capability::new(Subject::Documents, Action::Delete));
/// assert_eq!(reason.to_string(), "insufficient privilege for delete documents");
/// assert_eq!(DenialReason::RoleNotRecognized.to_string(), "role not recognized");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// No valid role; covers unknown, unparseable, absent and disallowed signals
    RoleNotRecognized,
    /// The role lacks the required capability
    InsufficientPrivilege(Capability),
}

impl DenialReason {
    /// Message shown to the member.
    pub fn user_message(&self) -> String {
        match self {
            DenialReason::RoleNotRecognized => {
                "Your role in this organization is not recognized. Contact your organization administrator."
                    .to_string()
            }
            DenialReason::InsufficientPrivilege(cap) => format!(
                "You do not have permission to {} {}.",
                cap.action.as_str(),
                cap.subject.label()
            ),
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::RoleNotRecognized => f.write_str("role not recognized"),
            DenialReason::InsufficientPrivilege(cap) => write!(
                f,
                "insufficient privilege for {} {}",
                cap.action.as_str(),
                cap.subject.label()
            ),
        }
    }
}

/// What to render for a navigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "render", content = "detail", rename_all = "snake_case")]
pub enum RenderDirective {
    /// Render the requested page
    Children,
    /// Render a loading indicator
    Loading(LoadingStage),
    /// Render a forbidden notice
    Forbidden(DenialReason),
    /// Navigate to another path
    Redirect(String),
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateDecision {
    /// State reached
    pub state: GateState,

    /// What to render
    pub directive: RenderDirective,

    /// Whether the caller should start sign-in
    pub sign_in_requested: bool,
}

impl GateDecision {
    fn new(state: GateState, directive: RenderDirective) -> Self {
        Self {
            state,
            directive,
            sign_in_requested: false,
        }
    }

    fn allowed() -> Self {
        Self::new(GateState::Allowed, RenderDirective::Children)
    }

    fn denied(reason: DenialReason) -> Self {
        Self::new(GateState::Denied, RenderDirective::Forbidden(reason))
    }

    fn redirect(to: &str) -> Self {
        Self::new(GateState::RedirectedSpecialCase, RenderDirective::Redirect(to.to_string()))
    }

    /// Check if the page may render.
    pub fn is_allowed(&self) -> bool {
        self.state == GateState::Allowed
    }

    /// The denial reason, if denied.
    pub fn denial(&self) -> Option<DenialReason> {
        match &self.directive {
            RenderDirective::Forbidden(reason) => Some(*reason),
            _ => None,
        }
    }

    /// The redirect target, if redirected.
    pub fn redirect_target(&self) -> Option<&str> {
        match &self.directive {
            RenderDirective::Redirect(to) => Some(to),
            _ => None,
        }
    }
}

/// A navigation to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Raw path, possibly with query and fragment
    pub path: String,

    /// Capability to require instead of resolving the path
    pub capability_override: Option<Capability>,
}

impl NavigationRequest {
    /// Navigation resolved through the route table.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            capability_override: None,
        }
    }

    /// Require `action` on `subject` regardless of the path.
    pub fn requiring(mut self, action: Action, subject: Subject) -> Self {
        self.capability_override = Some(Capability::new(subject, action));
        self
    }

    fn query_flag(&self, key: &str, value: &str) -> bool {
        let query = match self.path.split_once('?') {
            Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
            None => return false,
        };
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(k, v)| k == key && v == value)
    }
}

/// Session facts the gate evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    /// Whether an identity is signed in
    pub signed_in: bool,

    /// Current capability snapshot
    pub snapshot: &'a CapabilitySnapshot,

    /// Onboarding state of the current organization
    pub onboarding: OnboardingState,
}

/// Decides what each navigation renders.
///
/// # Example
///
/// ```
/// use portal_auth::{AuthorizationGate, CapabilityContext, GateInput, GateState, NavigationRequest};
/// use portal_org::OnboardingState;
///
/// let gate = AuthorizationGate::default();
/// let ctx = CapabilityContext::demo();
/// let snapshot = ctx.snapshot();
/// let input = GateInput { signed_in: true, snapshot: &snapshot, onboarding: OnboardingState::Completed };
///
/// let decision = gate.evaluate(&NavigationRequest::new("/dashboard/documents"), input);
/// assert_eq!(decision.state, GateState::Allowed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthorizationGate {
    config: GateConfig,
    routes: RoutePermissionResolver,
}

impl AuthorizationGate {
    /// Gate over the portal route table.
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            routes: RoutePermissionResolver::default(),
        }
    }

    /// Gate over a custom route resolver.
    pub fn with_routes(config: GateConfig, routes: RoutePermissionResolver) -> Self {
        Self { config, routes }
    }

    /// The gate configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The route resolver.
    pub fn routes(&self) -> &RoutePermissionResolver {
        &self.routes
    }

    /// Check whether `path` is inside the onboarding area.
    pub fn is_onboarding_path(&self, path: &str) -> bool {
        let Some(path) = normalize_path(path) else {
            return false;
        };
        let root = self.config.onboarding_route.trim_end_matches('/');
        path == root
            || path
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Evaluate one navigation.
    pub fn evaluate(&self, request: &NavigationRequest, input: GateInput<'_>) -> GateDecision {
        let decision = self.decide(request, input);
        match decision.state {
            GateState::Denied => tracing::info!(
                path = %request.path,
                role = ?input.snapshot.role(),
                reason = ?decision.denial(),
                "navigation denied"
            ),
            GateState::RedirectedSpecialCase => tracing::info!(
                path = %request.path,
                role = ?input.snapshot.role(),
                to = ?decision.redirect_target(),
                "navigation redirected"
            ),
            state => tracing::debug!(path = %request.path, state = state.as_str(), "navigation evaluated"),
        }
        decision
    }

    fn decide(&self, request: &NavigationRequest, input: GateInput<'_>) -> GateDecision {
        if !input.signed_in {
            return if self.config.auto_sign_in {
                GateDecision {
                    state: GateState::AwaitingIdentity,
                    directive: RenderDirective::Loading(LoadingStage::Auth),
                    sign_in_requested: true,
                }
            } else {
                GateDecision::new(
                    GateState::AwaitingIdentity,
                    RenderDirective::Redirect(self.config.sign_in_route.clone()),
                )
            };
        }

        let Some(role) = input.snapshot.role() else {
            return GateDecision::new(
                GateState::AwaitingRole,
                RenderDirective::Loading(LoadingStage::Organization),
            );
        };

        if !role.is_resolved() {
            return GateDecision::denied(DenialReason::RoleNotRecognized);
        }

        if request.capability_override.is_none() {
            if self.is_onboarding_path(&request.path) {
                return self.onboarding_decision(request, role.is_admin(), input.onboarding);
            }

            if self.config.onboarding_first
                && role.is_admin()
                && input.onboarding == OnboardingState::NotCompleted
                && normalize_path(&request.path).is_some_and(|p| p.starts_with("/dashboard/"))
            {
                return GateDecision::redirect(&self.config.onboarding_route);
            }
        }

        let required = request
            .capability_override
            .or_else(|| self.routes.required_capability(&request.path));

        match required {
            None => GateDecision::allowed(),
            Some(cap) if input.snapshot.capabilities().allows(cap) => GateDecision::allowed(),
            Some(cap) => GateDecision::denied(DenialReason::InsufficientPrivilege(cap)),
        }
    }

    fn onboarding_decision(
        &self,
        request: &NavigationRequest,
        is_admin: bool,
        onboarding: OnboardingState,
    ) -> GateDecision {
        if !is_admin {
            return GateDecision::redirect(&self.config.landing_route);
        }
        match onboarding {
            OnboardingState::Pending => GateDecision::new(
                GateState::Evaluating,
                RenderDirective::Loading(LoadingStage::Onboarding),
            ),
            OnboardingState::NotCompleted => GateDecision::allowed(),
            OnboardingState::Completed
                if self.config.allow_onboarding_revisit && request.query_flag("revisit", "true") =>
            {
                GateDecision::allowed()
            }
            OnboardingState::Completed => GateDecision::redirect(&self.config.landing_route),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CapabilityContext;
    use portal_org::{RawRoleSignal, RoleResolver};
    use std::sync::Arc;

    fn snapshot_for(code: i64) -> Arc<CapabilitySnapshot> {
        let ctx = CapabilityContext::new();
        let ticket = ctx.begin_refresh();
        ctx.commit(ticket, RoleResolver::resolve(&RawRoleSignal::Integer(code), "test"));
        ctx.snapshot()
    }

    fn signed_in(snapshot: &CapabilitySnapshot, onboarding: OnboardingState) -> GateInput<'_> {
        GateInput {
            signed_in: true,
            snapshot,
            onboarding,
        }
    }

    #[test]
    fn test_awaiting_identity_requests_sign_in() {
        let gate = AuthorizationGate::default();
        let ctx = CapabilityContext::new();
        let snapshot = ctx.snapshot();
        let input = GateInput {
            signed_in: false,
            snapshot: &snapshot,
            onboarding: OnboardingState::Pending,
        };

        let decision = gate.evaluate(&NavigationRequest::new("/dashboard/overview"), input);
        assert_eq!(decision.state, GateState::AwaitingIdentity);
        assert_eq!(decision.directive, RenderDirective::Loading(LoadingStage::Auth));
        assert!(decision.sign_in_requested);

        let gate = AuthorizationGate::new(GateConfig {
            auto_sign_in: false,
            ..GateConfig::default()
        });
        let decision = gate.evaluate(&NavigationRequest::new("/dashboard/overview"), input);
        assert_eq!(decision.redirect_target(), Some("/"));
        assert!(!decision.sign_in_requested);
    }

    #[test]
    fn test_awaiting_role_renders_loading() {
        let gate = AuthorizationGate::default();
        let ctx = CapabilityContext::new();
        ctx.begin_refresh();
        let snapshot = ctx.snapshot();

        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/overview"),
            signed_in(&snapshot, OnboardingState::Pending),
        );
        assert_eq!(decision.state, GateState::AwaitingRole);
        assert_eq!(decision.directive, RenderDirective::Loading(LoadingStage::Organization));
        assert!(!decision.state.is_terminal());
    }

    #[test]
    fn test_admin_overview_allowed() {
        let gate = AuthorizationGate::default();
        let snapshot = snapshot_for(123_950_000);
        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/overview"),
            signed_in(&snapshot, OnboardingState::Completed),
        );
        assert!(decision.is_allowed());
        assert_eq!(decision.directive, RenderDirective::Children);
    }

    #[test]
    fn test_unknown_code_denied_role_not_recognized() {
        let gate = AuthorizationGate::default();
        let snapshot = snapshot_for(999_999_999);
        let decision = gate.evaluate(
            &NavigationRequest::new("/about"),
            signed_in(&snapshot, OnboardingState::Completed),
        );
        assert_eq!(decision.state, GateState::Denied);
        assert_eq!(decision.denial(), Some(DenialReason::RoleNotRecognized));
    }

    #[test]
    fn test_disallowed_code_shares_denial_message() {
        let gate = AuthorizationGate::default();
        let snapshot = snapshot_for(123_950_001);
        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/overview"),
            signed_in(&snapshot, OnboardingState::Completed),
        );
        assert_eq!(decision.denial(), Some(DenialReason::RoleNotRecognized));
    }

    #[test]
    fn test_onboarding_special_case() {
        let gate = AuthorizationGate::default();
        let admin = snapshot_for(123_950_000);
        let viewer = snapshot_for(123_950_004);
        let request = NavigationRequest::new("/dashboard/onboarding");

        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::NotCompleted));
        assert!(decision.is_allowed());

        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::Pending));
        assert_eq!(decision.state, GateState::Evaluating);
        assert_eq!(decision.directive, RenderDirective::Loading(LoadingStage::Onboarding));

        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::Completed));
        assert_eq!(decision.redirect_target(), Some("/dashboard/overview"));

        for state in [OnboardingState::NotCompleted, OnboardingState::Completed] {
            let decision = gate.evaluate(&request, signed_in(&viewer, state));
            assert_eq!(decision.state, GateState::RedirectedSpecialCase);
            assert_eq!(decision.redirect_target(), Some("/dashboard/overview"));
        }

        // Sub-pages and trailing slashes are part of the area.
        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/onboarding/step-2/"),
            signed_in(&viewer, OnboardingState::NotCompleted),
        );
        assert_eq!(decision.redirect_target(), Some("/dashboard/overview"));
        assert!(!gate.is_onboarding_path("/dashboard/onboardingx"));
    }

    #[test]
    fn test_onboarding_revisit() {
        let admin = snapshot_for(123_950_000);
        let request = NavigationRequest::new("/dashboard/onboarding?revisit=true");

        let gate = AuthorizationGate::default();
        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::Completed));
        assert!(decision.is_allowed());

        let gate = AuthorizationGate::new(GateConfig {
            allow_onboarding_revisit: false,
            ..GateConfig::default()
        });
        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::Completed));
        assert_eq!(decision.redirect_target(), Some("/dashboard/overview"));

        let request = NavigationRequest::new("/dashboard/onboarding?revisit=false");
        let decision = AuthorizationGate::default()
            .evaluate(&request, signed_in(&admin, OnboardingState::Completed));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_onboarding_first_redirect() {
        let gate = AuthorizationGate::new(GateConfig {
            onboarding_first: true,
            ..GateConfig::default()
        });
        let admin = snapshot_for(123_950_000);
        let viewer = snapshot_for(123_950_004);

        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/documents"),
            signed_in(&admin, OnboardingState::NotCompleted),
        );
        assert_eq!(decision.redirect_target(), Some("/dashboard/onboarding"));

        // The dashboard root and other roles are left alone.
        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard"),
            signed_in(&admin, OnboardingState::NotCompleted),
        );
        assert!(decision.is_allowed());
        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/documents"),
            signed_in(&viewer, OnboardingState::NotCompleted),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_insufficient_privilege() {
        let gate = AuthorizationGate::default();
        let viewer = snapshot_for(123_950_004);

        let decision = gate.evaluate(
            &NavigationRequest::new("/dashboard/forms/cancel-loan"),
            signed_in(&viewer, OnboardingState::Completed),
        );
        assert_eq!(
            decision.denial(),
            Some(DenialReason::InsufficientPrivilege(Capability::new(Subject::Forms, Action::Create)))
        );
        assert_eq!(
            decision.denial().map(|r| r.to_string()).as_deref(),
            Some("insufficient privilege for create forms")
        );
    }

    #[test]
    fn test_override_bypasses_path_resolution() {
        let gate = AuthorizationGate::default();
        let creator = snapshot_for(123_950_002);
        let admin = snapshot_for(123_950_000);

        // Override skips the onboarding redirect.
        let request = NavigationRequest::new("/dashboard/onboarding").requiring(Action::Read, Subject::Documents);
        let decision = gate.evaluate(&request, signed_in(&creator, OnboardingState::Completed));
        assert!(decision.is_allowed());

        let request = NavigationRequest::new("/dashboard/overview").requiring(Action::Delete, Subject::Documents);
        let decision = gate.evaluate(&request, signed_in(&creator, OnboardingState::Completed));
        assert_eq!(decision.state, GateState::Denied);
        let decision = gate.evaluate(&request, signed_in(&admin, OnboardingState::Completed));
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_unprotected_path_allowed() {
        let gate = AuthorizationGate::default();
        let viewer = snapshot_for(123_950_004);
        let decision = gate.evaluate(
            &NavigationRequest::new("/about"),
            signed_in(&viewer, OnboardingState::Completed),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_decision_serializes() {
        let decision = GateDecision::denied(DenialReason::RoleNotRecognized);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["state"], "denied");
        assert_eq!(json["directive"]["render"], "forbidden");
        assert_eq!(json["directive"]["detail"]["kind"], "role_not_recognized");
    }
}
