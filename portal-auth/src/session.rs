//! Session facade
//!
//! [`Session`] ties the pieces together for one signed-in member: identity,
//! organization selection, capability context and onboarding state. Role
//! recomputation happens only on explicit triggers: sign-in, organization
//! switch and [`Session::refresh`].

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use portal_org::{OnboardingState, OnboardingStatus, SessionContext};
use portal_rbac::{Action, Subject};
use tracing::instrument;
use uuid::Uuid;

use crate::config::GateConfig;
use crate::context::{CapabilityContext, CapabilitySnapshot};
use crate::directory::{DirectoryService, Identity};
use crate::error::{AuthError, AuthResult};
use crate::gate::{AuthorizationGate, GateDecision, GateInput, NavigationRequest};
use crate::retry::{retry_upstream, RetryPolicy};

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    context: Option<SessionContext>,
    account_id: Option<String>,
    onboarding: OnboardingState,
    last_onboarding_check: Option<OnboardingStatus>,
}

/// One member's authorization session.
pub struct Session {
    directory: Arc<dyn DirectoryService>,
    gate: AuthorizationGate,
    capabilities: Arc<CapabilityContext>,
    role_policy: RetryPolicy,
    onboarding_policy: RetryPolicy,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("gate", &self.gate)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a signed-out session.
    pub fn new(directory: Arc<dyn DirectoryService>, config: GateConfig) -> Self {
        let capabilities = Arc::new(CapabilityContext::from_config(&config));
        Self {
            directory,
            role_policy: RetryPolicy::for_role_fetch(&config),
            onboarding_policy: RetryPolicy::for_onboarding_check(&config),
            gate: AuthorizationGate::new(config),
            capabilities,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Override the retry policies (role fetch, onboarding check).
    pub fn with_policies(mut self, role_policy: RetryPolicy, onboarding_policy: RetryPolicy) -> Self {
        self.role_policy = role_policy;
        self.onboarding_policy = onboarding_policy;
        self
    }

    /// The shared capability context.
    pub fn capabilities(&self) -> Arc<CapabilityContext> {
        Arc::clone(&self.capabilities)
    }

    /// The navigation gate.
    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// The signed-in identity.
    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// The organization selection.
    pub fn context(&self) -> Option<SessionContext> {
        self.read().context.clone()
    }

    /// Onboarding state of the current organization.
    pub fn onboarding(&self) -> OnboardingState {
        self.read().onboarding
    }

    /// The most recent completed onboarding check.
    pub fn last_onboarding_check(&self) -> Option<OnboardingStatus> {
        self.read().last_onboarding_check.clone()
    }

    /// Sign in and resolve the member's role.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn sign_in(&self, identity: Identity) -> AuthResult<Arc<CapabilitySnapshot>> {
        {
            let mut state = self.write();
            state.context = Some(SessionContext::new(identity.user_id));
            state.identity = Some(identity);
            state.account_id = None;
            state.onboarding = OnboardingState::Pending;
            state.last_onboarding_check = None;
        }
        tracing::info!("signed in");
        self.refresh().await
    }

    /// Sign out. In-flight refreshes are discarded.
    pub fn sign_out(&self) {
        *self.write() = SessionState::default();
        self.capabilities.clear();
        tracing::info!("signed out");
    }

    /// Switch organization and re-resolve the role.
    ///
    /// Selecting the organization that is already current does nothing.
    #[instrument(skip(self))]
    pub async fn switch_organization(&self, organization_id: Uuid) -> AuthResult<Arc<CapabilitySnapshot>> {
        let changed = {
            let mut state = self.write();
            let context = state
                .context
                .as_mut()
                .ok_or_else(|| AuthError::IdentityUnavailable("not signed in".to_string()))?;
            context.switch_organization(organization_id)
        };
        if !changed {
            tracing::debug!("organization unchanged, keeping capabilities");
            return Ok(self.capabilities.snapshot());
        }
        tracing::info!("organization switched");
        self.refresh().await
    }

    /// Re-fetch the role for the current organization, then the onboarding
    /// state when the role is admin.
    ///
    /// # Returns
    ///
    /// The committed snapshot, or [`AuthError::Superseded`] when a newer
    /// refresh or a sign-out overtook this one
    pub async fn refresh(&self) -> AuthResult<Arc<CapabilitySnapshot>> {
        let (identity, organization_id) = {
            let mut state = self.write();
            let identity = state
                .identity
                .clone()
                .ok_or_else(|| AuthError::IdentityUnavailable("not signed in".to_string()))?;
            state.onboarding = OnboardingState::Pending;
            let organization_id = state.context.as_ref().and_then(SessionContext::active_organization);
            (identity, organization_id)
        };

        let outcome = self
            .capabilities
            .refresh_with_profile(self.directory.as_ref(), &identity, organization_id, &self.role_policy)
            .await?;

        let account_id = outcome
            .profile
            .as_ref()
            .and_then(|profile| profile.account_id())
            .map(str::to_string);
        self.write().account_id = account_id;

        if outcome.snapshot.role().is_some_and(|role| role.is_admin()) {
            self.refresh_onboarding().await;
        } else {
            self.write().onboarding = OnboardingState::NotCompleted;
        }

        if outcome.snapshot.generation() != self.capabilities.snapshot().generation() {
            return Err(AuthError::Superseded);
        }
        Ok(outcome.snapshot)
    }

    /// Check the onboarding state for the current organization's account.
    ///
    /// Never fails: a missing account, a missing record, or an upstream
    /// failure after retries all count as "not completed".
    #[instrument(skip(self))]
    pub async fn refresh_onboarding(&self) -> OnboardingState {
        let generation = self.capabilities.snapshot().generation();
        let account_id = {
            let mut state = self.write();
            state.onboarding = OnboardingState::Pending;
            state.account_id.clone()
        };

        let status = match account_id {
            None => {
                tracing::debug!("no account id, onboarding treated as not completed");
                OnboardingStatus::without_account()
            }
            Some(account_id) => {
                let result = retry_upstream(&self.onboarding_policy, "fetch_onboarding_state", || {
                    self.directory.fetch_onboarding_state(&account_id)
                })
                .await;
                let state = match result {
                    Ok(OnboardingState::Pending) => OnboardingState::NotCompleted,
                    Ok(state) => state,
                    Err(AuthError::NotFound(_)) => {
                        tracing::debug!(account_id = %account_id, "no onboarding record");
                        OnboardingState::NotCompleted
                    }
                    Err(err) => {
                        tracing::warn!(account_id = %account_id, error = %err, "onboarding check failed");
                        OnboardingState::NotCompleted
                    }
                };
                OnboardingStatus::new(account_id, state)
            }
        };

        if self.capabilities.snapshot().generation() != generation {
            tracing::debug!("discarding onboarding result for a superseded refresh");
            return self.onboarding();
        }

        let observed = status.state;
        let mut state = self.write();
        state.onboarding = observed;
        state.last_onboarding_check = Some(status);
        observed
    }

    /// Evaluate a navigation to `path`.
    pub fn navigate(&self, path: &str) -> GateDecision {
        self.navigate_with(&NavigationRequest::new(path))
    }

    /// Evaluate a navigation request.
    pub fn navigate_with(&self, request: &NavigationRequest) -> GateDecision {
        let snapshot = self.capabilities.snapshot();
        let (signed_in, onboarding) = {
            let state = self.read();
            (state.identity.is_some(), state.onboarding)
        };
        self.gate.evaluate(
            request,
            GateInput {
                signed_in,
                snapshot: &snapshot,
                onboarding,
            },
        )
    }

    /// Check whether `action` may be performed on `subject`.
    pub fn can_perform(&self, action: Action, subject: Subject) -> bool {
        self.capabilities.can_perform(action, subject)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
