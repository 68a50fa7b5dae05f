//! End-to-end tests for the session, capability context and navigation gate.
//!
//! A scripted in-memory directory stands in for the upstream service. Slow
//! responses run on tokio's paused clock so timeouts and races are
//! deterministic.
//!
//! Scenarios:
//! 1. Admin code opens the overview
//! 2. Unknown and disallowed codes are denied "role not recognized"
//! 3. Onboarding is admin-only while incomplete
//! 4. Timeouts and retries
//! 5. Overlapping organization switches
//! 6. Demo mode

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portal_auth::{
    AuthError, AuthResult, CapabilityContext, DenialReason, DirectoryService, GateConfig,
    GateState, Identity, LoadingStage, RenderDirective, RetryPolicy, Session,
};
use portal_org::{AccessProfile, OnboardingState, OrganizationRecord, ProfileRecord, RawRoleSignal};
use portal_rbac::{Action, EffectiveRole, Role, Subject};
use uuid::Uuid;

/// Scripted directory keyed by organization id.
#[derive(Default)]
struct ScriptedDirectory {
    /// Profile and response delay per organization
    profiles: Mutex<HashMap<Option<Uuid>, (Duration, AccessProfile)>>,
    /// Onboarding state per account
    onboarding: Mutex<HashMap<String, OnboardingState>>,
    /// Profile fetches that fail with 503 before answering
    transient_failures: AtomicU32,
    /// Profile fetch attempts
    profile_calls: AtomicU32,
    /// Onboarding fetch attempts
    onboarding_calls: AtomicU32,
}

impl ScriptedDirectory {
    fn new() -> Self {
        Self::default()
    }

    fn profile(self, organization: Option<Uuid>, profile: AccessProfile) -> Self {
        self.delayed_profile(organization, Duration::ZERO, profile)
    }

    fn delayed_profile(self, organization: Option<Uuid>, delay: Duration, profile: AccessProfile) -> Self {
        self.profiles.lock().unwrap().insert(organization, (delay, profile));
        self
    }

    fn onboarding(self, account_id: &str, state: OnboardingState) -> Self {
        self.onboarding.lock().unwrap().insert(account_id.to_string(), state);
        self
    }

    fn failing_first(self, attempts: u32) -> Self {
        self.transient_failures.store(attempts, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl DirectoryService for ScriptedDirectory {
    async fn fetch_access_profile(
        &self,
        _identity: &Identity,
        organization_id: Option<Uuid>,
    ) -> AuthResult<AccessProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);

        if self.transient_failures.load(Ordering::SeqCst) > 0 {
            self.transient_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(AuthError::Upstream {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let entry = self.profiles.lock().unwrap().get(&organization_id).cloned();
        let (delay, profile) = entry.ok_or_else(|| AuthError::NotFound("access profile".to_string()))?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(profile)
    }

    async fn fetch_onboarding_state(&self, account_id: &str) -> AuthResult<OnboardingState> {
        self.onboarding_calls.fetch_add(1, Ordering::SeqCst);
        self.onboarding
            .lock()
            .unwrap()
            .get(account_id)
            .copied()
            .ok_or_else(|| AuthError::NotFound(account_id.to_string()))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn organization(code: impl Into<RawRoleSignal>, account_id: &str) -> AccessProfile {
    AccessProfile::new().with_organization(
        OrganizationRecord::new("Acme Cooperative")
            .with_account_id(account_id)
            .with_access_role(code),
    )
}

fn session_with(directory: ScriptedDirectory, config: GateConfig) -> (Arc<ScriptedDirectory>, Session) {
    let directory = Arc::new(directory);
    let session = Session::new(directory.clone(), config);
    (directory, session)
}

fn member() -> Identity {
    Identity::new(Uuid::now_v7()).with_email("member@example.com")
}

#[tokio::test]
async fn test_admin_code_opens_overview() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new()
            .profile(None, organization(123_950_000_i64, "acc-1"))
            .onboarding("acc-1", OnboardingState::Completed),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Known(Role::Admin)));

    let decision = session.navigate("/dashboard/overview");
    assert_eq!(decision.state, GateState::Allowed);
    assert_eq!(decision.directive, RenderDirective::Children);
}

#[tokio::test]
async fn test_thousands_separated_code_matches_integer() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new().profile(None, organization("123,950,000", "acc-1")),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Known(Role::Admin)));
}

#[tokio::test]
async fn test_unknown_code_is_denied() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new().profile(None, organization(999_999_999_i64, "acc-1")),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Unresolved));
    assert!(!session.can_perform(Action::Read, Subject::Marketplace));

    let decision = session.navigate("/dashboard/overview");
    assert_eq!(decision.state, GateState::Denied);
    assert_eq!(decision.denial(), Some(DenialReason::RoleNotRecognized));
    assert_eq!(decision.denial().unwrap().to_string(), "role not recognized");
}

#[tokio::test]
async fn test_disallowed_directory_role_is_denied() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new().profile(None, organization(123_950_001_i64, "acc-1")),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    let reason = snapshot
        .resolution()
        .and_then(|resolution| resolution.reason.clone())
        .unwrap();
    assert!(reason.is_disallowed());
    assert_eq!(
        session.navigate("/dashboard/documents").denial(),
        Some(DenialReason::RoleNotRecognized)
    );
}

#[tokio::test]
async fn test_onboarding_open_to_admin_until_complete() {
    init_tracing();
    let (directory, session) = session_with(
        ScriptedDirectory::new()
            .profile(None, organization(123_950_000_i64, "acc-1"))
            .onboarding("acc-1", OnboardingState::NotCompleted),
        GateConfig::default(),
    );

    session.sign_in(member()).await.unwrap();
    assert_eq!(directory.onboarding_calls.load(Ordering::SeqCst), 1);
    assert!(session.navigate("/dashboard/onboarding").is_allowed());

    directory
        .onboarding
        .lock()
        .unwrap()
        .insert("acc-1".to_string(), OnboardingState::Completed);
    assert_eq!(session.refresh_onboarding().await, OnboardingState::Completed);

    assert_eq!(
        session.navigate("/dashboard/onboarding").redirect_target(),
        Some("/dashboard/overview")
    );
    assert!(session.navigate("/dashboard/onboarding?revisit=true").is_allowed());
}

#[tokio::test]
async fn test_viewer_redirected_from_onboarding() {
    init_tracing();
    let (directory, session) = session_with(
        ScriptedDirectory::new().profile(None, organization(123_950_004_i64, "acc-1")),
        GateConfig::default(),
    );

    session.sign_in(member()).await.unwrap();
    assert_eq!(directory.onboarding_calls.load(Ordering::SeqCst), 0);

    let decision = session.navigate("/dashboard/onboarding");
    assert_eq!(decision.state, GateState::RedirectedSpecialCase);
    assert_eq!(
        decision.directive,
        RenderDirective::Redirect("/dashboard/overview".to_string())
    );

    // Viewer reads, but cannot submit forms.
    assert!(session.navigate("/dashboard/forms/123").is_allowed());
    assert_eq!(
        session.navigate("/dashboard/forms/request-for-funding").denial(),
        Some(DenialReason::InsufficientPrivilege(portal_rbac::Capability::new(
            Subject::Forms,
            Action::Create
        )))
    );
}

#[tokio::test]
async fn test_onboarding_first_sends_admin_to_wizard() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new().profile(None, organization(123_950_000_i64, "acc-1")),
        GateConfig {
            onboarding_first: true,
            ..GateConfig::default()
        },
    );

    session.sign_in(member()).await.unwrap();
    assert_eq!(session.onboarding(), OnboardingState::NotCompleted);
    assert_eq!(
        session.navigate("/dashboard/requests").redirect_target(),
        Some("/dashboard/onboarding")
    );
    assert!(session.navigate("/dashboard/onboarding").is_allowed());
}

#[tokio::test(start_paused = true)]
async fn test_loading_while_role_in_flight() {
    init_tracing();
    let (_, session) = session_with(
        ScriptedDirectory::new().delayed_profile(
            None,
            Duration::from_secs(3),
            organization(123_950_002_i64, "acc-1"),
        ),
        GateConfig::default(),
    );

    let (signed_in, during) = tokio::join!(session.sign_in(member()), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.navigate("/dashboard/documents")
    });

    assert_eq!(during.state, GateState::AwaitingRole);
    assert_eq!(during.directive, RenderDirective::Loading(LoadingStage::Organization));

    assert_eq!(signed_in.unwrap().role(), Some(EffectiveRole::Known(Role::Creator)));
    assert!(session.navigate("/dashboard/documents").is_allowed());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_commits_unresolved() {
    init_tracing();
    let (directory, session) = session_with(
        ScriptedDirectory::new().delayed_profile(
            None,
            Duration::from_secs(60),
            organization(123_950_000_i64, "acc-1"),
        ),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(directory.profile_calls.load(Ordering::SeqCst), 2);
    assert_eq!(snapshot.role(), Some(EffectiveRole::Unresolved));
    assert_eq!(
        snapshot
            .resolution()
            .and_then(|resolution| resolution.reason.as_ref())
            .map(|reason| reason.as_str()),
        Some("unavailable")
    );

    let decision = session.navigate("/dashboard/overview");
    assert_eq!(decision.denial(), Some(DenialReason::RoleNotRecognized));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried() {
    init_tracing();
    let (directory, session) = session_with(
        ScriptedDirectory::new()
            .profile(None, organization(123_950_003_i64, "acc-1"))
            .failing_first(1),
        GateConfig::default(),
    );

    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(directory.profile_calls.load(Ordering::SeqCst), 2);
    assert_eq!(snapshot.role(), Some(EffectiveRole::Known(Role::Approver)));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_switch_discards_stale_result() {
    init_tracing();
    let slow = Uuid::now_v7();
    let fast = Uuid::now_v7();
    let (_, session) = session_with(
        ScriptedDirectory::new()
            .profile(None, organization(123_950_004_i64, "acc-0"))
            .delayed_profile(Some(slow), Duration::from_secs(5), organization(123_950_000_i64, "acc-1"))
            .profile(Some(fast), organization(123_950_002_i64, "acc-2")),
        GateConfig::default(),
    );
    session.sign_in(member()).await.unwrap();

    let (stale, latest) = tokio::join!(session.switch_organization(slow), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.switch_organization(fast).await
    });

    assert!(matches!(stale, Err(AuthError::Superseded)));
    assert_eq!(latest.unwrap().role(), Some(EffectiveRole::Known(Role::Creator)));
    assert_eq!(
        session.capabilities().role(),
        Some(EffectiveRole::Known(Role::Creator))
    );
    assert!(!session.can_perform(Action::Delete, Subject::Documents));
    assert_eq!(session.context().unwrap().recent_organizations(2), &[fast, slow]);
}

#[tokio::test(start_paused = true)]
async fn test_context_refresh_superseded_directly() {
    init_tracing();
    let slow = Uuid::now_v7();
    let directory = ScriptedDirectory::new()
        .delayed_profile(Some(slow), Duration::from_secs(5), organization(123_950_000_i64, "acc-1"))
        .profile(None, organization(123_950_004_i64, "acc-0"));
    let ctx = CapabilityContext::new();
    let identity = member();
    let policy = RetryPolicy::no_retry();

    let (stale, latest) = tokio::join!(ctx.refresh(&directory, &identity, Some(slow), &policy), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.refresh(&directory, &identity, None, &policy).await
    });

    assert!(matches!(stale, Err(AuthError::Superseded)));
    assert_eq!(latest.unwrap().generation(), 2);
    assert_eq!(ctx.role(), Some(EffectiveRole::Known(Role::Viewer)));
}

#[tokio::test]
async fn test_demo_mode_skips_directory() {
    init_tracing();
    let (directory, session) = session_with(
        ScriptedDirectory::new(),
        GateConfig {
            demo_mode: true,
            ..GateConfig::default()
        },
    );

    assert!(!session.capabilities().is_loading());
    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Known(Role::Admin)));
    assert_eq!(directory.profile_calls.load(Ordering::SeqCst), 0);
    assert!(session.navigate("/dashboard/settings").is_allowed());
}

#[tokio::test]
async fn test_claimed_role_and_record_precedence() {
    init_tracing();

    // A canonical claim from the identity provider wins over directory records.
    let (_, session) = session_with(
        ScriptedDirectory::new().profile(None, organization(123_950_004_i64, "acc-1")),
        GateConfig::default(),
    );
    let snapshot = session
        .sign_in(member().with_claimed_role("approver"))
        .await
        .unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Known(Role::Approver)));

    // A present but unparseable profile role does not fall through to the organization.
    let profile = organization(123_950_000_i64, "acc-1")
        .with_profile(ProfileRecord::new("Dana").with_access_role("not-a-code"));
    let (_, session) = session_with(ScriptedDirectory::new().profile(None, profile), GateConfig::default());
    let snapshot = session.sign_in(member()).await.unwrap();
    assert_eq!(snapshot.role(), Some(EffectiveRole::Unresolved));
}

#[tokio::test]
async fn test_signed_out_navigation_requests_sign_in() {
    init_tracing();
    let (_, session) = session_with(ScriptedDirectory::new(), GateConfig::default());

    let decision = session.navigate("/dashboard/overview");
    assert_eq!(decision.state, GateState::AwaitingIdentity);
    assert!(decision.sign_in_requested);

    let (_, session) = session_with(
        ScriptedDirectory::new(),
        GateConfig {
            auto_sign_in: false,
            ..GateConfig::default()
        },
    );
    assert_eq!(session.navigate("/dashboard/overview").redirect_target(), Some("/"));
}
