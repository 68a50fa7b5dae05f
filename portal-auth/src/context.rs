//! Session-scoped capability cache
//!
//! [`CapabilityContext`] holds the current role and capability set for one
//! session. State lives in an immutable [`CapabilitySnapshot`] behind an
//! `Arc`; a refresh builds a new snapshot and swaps it in, so readers always
//! see one consistent role/capability pair.
//!
//! Every refresh takes a [`RefreshTicket`]. Only the most recently issued
//! ticket may commit; results for older tickets are dropped. While a refresh
//! is in flight the snapshot is "loading" and allows nothing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use portal_org::{AccessProfile, RoleResolution, RoleResolver};
use portal_rbac::{Action, CapabilityMatrixBuilder, CapabilitySet, EffectiveRole, Role, Subject};
use tracing::instrument;
use uuid::Uuid;

use crate::config::GateConfig;
use crate::directory::{DirectoryService, Identity};
use crate::error::{AuthError, AuthResult};
use crate::retry::{retry_upstream, RetryPolicy};

/// One consistent view of the session's role and capabilities.
#[derive(Debug, Clone)]
pub struct CapabilitySnapshot {
    role: Option<EffectiveRole>,
    capabilities: Arc<CapabilitySet>,
    resolution: Option<RoleResolution>,
    generation: u64,
    updated_at: DateTime<Utc>,
}

impl CapabilitySnapshot {
    fn loading(generation: u64) -> Self {
        Self {
            role: None,
            capabilities: CapabilityMatrixBuilder::shared(EffectiveRole::Unresolved),
            resolution: None,
            generation,
            updated_at: Utc::now(),
        }
    }

    fn committed(generation: u64, role: EffectiveRole, resolution: Option<RoleResolution>) -> Self {
        Self {
            role: Some(role),
            capabilities: CapabilityMatrixBuilder::shared(role),
            resolution,
            generation,
            updated_at: Utc::now(),
        }
    }

    /// Check if no role has been committed yet.
    pub fn is_loading(&self) -> bool {
        self.role.is_none()
    }

    /// The committed role; `None` while loading.
    pub fn role(&self) -> Option<EffectiveRole> {
        self.role
    }

    /// The capability set. Denies everything while loading.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Audit record behind the committed role, if any.
    pub fn resolution(&self) -> Option<&RoleResolution> {
        self.resolution.as_ref()
    }

    /// Ticket generation that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this snapshot was built.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check whether `action` may be performed on `subject`.
    pub fn can(&self, action: Action, subject: Subject) -> bool {
        !self.is_loading() && self.capabilities.can(action, subject)
    }
}

/// Result of a committed refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// The snapshot that was committed
    pub snapshot: Arc<CapabilitySnapshot>,

    /// The fetched profile; `None` when the fetch failed or was skipped
    pub profile: Option<AccessProfile>,
}

/// Permission to commit one refresh result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    /// The generation this ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Session-scoped role and capability cache.
///
/// # Example
///
/// ```
/// use portal_auth::CapabilityContext;
/// use portal_org::{RawRoleSignal, RoleResolver};
/// use portal_rbac::{Action, Subject};
///
/// let ctx = CapabilityContext::new();
/// let ticket = ctx.begin_refresh();
/// assert!(!ctx.can_perform(Action::Read, Subject::Documents));
///
/// let resolution = RoleResolver::resolve(&RawRoleSignal::Integer(123950004), "example");
/// assert!(ctx.commit(ticket, resolution));
/// assert!(ctx.can_perform(Action::Read, Subject::Documents));
/// assert!(!ctx.can_perform(Action::Delete, Subject::Documents));
/// ```
#[derive(Debug)]
pub struct CapabilityContext {
    snapshot: RwLock<Arc<CapabilitySnapshot>>,
    generation: AtomicU64,
    demo_mode: bool,
}

impl Default for CapabilityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityContext {
    /// A context with nothing committed yet.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CapabilitySnapshot::loading(0))),
            generation: AtomicU64::new(0),
            demo_mode: false,
        }
    }

    /// A demo context: admin from the start, never loading, never fetches.
    pub fn demo() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CapabilitySnapshot::committed(
                0,
                EffectiveRole::Known(Role::Admin),
                None,
            ))),
            generation: AtomicU64::new(0),
            demo_mode: true,
        }
    }

    /// Build from configuration (demo mode or regular).
    pub fn from_config(config: &GateConfig) -> Self {
        if config.demo_mode {
            Self::demo()
        } else {
            Self::new()
        }
    }

    /// Check if this context is in demo mode.
    pub fn is_demo(&self) -> bool {
        self.demo_mode
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CapabilitySnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Check if no role is currently committed.
    pub fn is_loading(&self) -> bool {
        self.snapshot().is_loading()
    }

    /// The committed role; `None` while loading.
    pub fn role(&self) -> Option<EffectiveRole> {
        self.snapshot().role()
    }

    /// Start a refresh: publish a loading snapshot and issue a ticket.
    ///
    /// Any older ticket stops being able to commit. In demo mode the admin
    /// snapshot stays in place.
    pub fn begin_refresh(&self) -> RefreshTicket {
        let mut guard = self.write();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.demo_mode {
            *guard = Arc::new(CapabilitySnapshot::loading(generation));
        }
        tracing::debug!(generation, "capability refresh started");
        RefreshTicket { generation }
    }

    /// Check whether `ticket` is still the latest.
    pub fn is_current(&self, ticket: RefreshTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Commit a resolved role for `ticket`.
    ///
    /// # Returns
    ///
    /// `false` if the ticket was superseded and the result was discarded
    pub fn commit(&self, ticket: RefreshTicket, resolution: RoleResolution) -> bool {
        let role = resolution.role;
        self.publish(ticket, role, Some(resolution))
    }

    /// Commit the unresolved role for `ticket` after an upstream failure.
    pub fn fail(&self, ticket: RefreshTicket, error: &AuthError) -> bool {
        if error.is_server_error() {
            tracing::error!(generation = ticket.generation, error = %error, "role lookup failed");
        } else {
            tracing::warn!(generation = ticket.generation, error = %error, "role lookup failed");
        }
        let resolution = RoleResolution::unavailable(error.to_string(), "capability_context:refresh");
        self.publish(ticket, EffectiveRole::Unresolved, Some(resolution))
    }

    /// Drop the committed role (sign-out). Outstanding tickets are voided.
    pub fn clear(&self) {
        let mut guard = self.write();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.demo_mode {
            *guard = Arc::new(CapabilitySnapshot::loading(generation));
        }
    }

    /// Fetch the access profile, resolve the role and commit it.
    ///
    /// A fetch that fails or times out commits the unresolved role.
    ///
    /// # Returns
    ///
    /// The committed snapshot, or [`AuthError::Superseded`] when a newer
    /// refresh started while this one was in flight
    pub async fn refresh<D>(
        &self,
        directory: &D,
        identity: &Identity,
        organization_id: Option<Uuid>,
        policy: &RetryPolicy,
    ) -> AuthResult<Arc<CapabilitySnapshot>>
    where
        D: DirectoryService + ?Sized,
    {
        self.refresh_with_profile(directory, identity, organization_id, policy)
            .await
            .map(|outcome| outcome.snapshot)
    }

    /// Like [`refresh`](Self::refresh), also returning the fetched profile.
    #[instrument(skip(self, directory, identity, policy), fields(user_id = %identity.user_id))]
    pub async fn refresh_with_profile<D>(
        &self,
        directory: &D,
        identity: &Identity,
        organization_id: Option<Uuid>,
        policy: &RetryPolicy,
    ) -> AuthResult<RefreshOutcome>
    where
        D: DirectoryService + ?Sized,
    {
        if self.demo_mode {
            tracing::debug!("demo mode, skipping role fetch");
            return Ok(RefreshOutcome {
                snapshot: self.snapshot(),
                profile: None,
            });
        }

        let ticket = self.begin_refresh();
        let fetched = retry_upstream(policy, "fetch_access_profile", || {
            directory.fetch_access_profile(identity, organization_id)
        })
        .await;

        let (committed, profile) = match fetched {
            Ok(mut profile) => {
                if profile.claimed_role.is_none() {
                    profile.claimed_role = identity.claimed_role.clone();
                }
                let resolution = RoleResolver::resolve_profile(&profile, "capability_context:refresh");
                (self.commit(ticket, resolution), Some(profile))
            }
            Err(err) => (self.fail(ticket, &err), None),
        };

        if committed {
            Ok(RefreshOutcome {
                snapshot: self.snapshot(),
                profile,
            })
        } else {
            Err(AuthError::Superseded)
        }
    }

    /// Check whether `action` may be performed on `subject`.
    ///
    /// Always `false` while loading.
    pub fn can_perform(&self, action: Action, subject: Subject) -> bool {
        self.snapshot().can(action, subject)
    }

    /// Check whether `action` may be performed on at least one of `subjects`.
    pub fn can_perform_any(&self, action: Action, subjects: &[Subject]) -> bool {
        let snapshot = self.snapshot();
        subjects.iter().any(|subject| snapshot.can(action, *subject))
    }

    /// Evaluate a batch of named checks against one snapshot.
    ///
    /// Each check passes if `action` is allowed on any of its subjects.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_auth::CapabilityContext;
    /// use portal_rbac::{Action, Subject};
    ///
    /// let ctx = CapabilityContext::demo();
    /// let results = ctx.check_all(&[
    ///     ("delete_docs", Action::Delete, &[Subject::Documents][..]),
    ///     ("publish_anything", Action::Publish, &[Subject::HelpCenter, Subject::Forms][..]),
    /// ]);
    /// assert_eq!(results["delete_docs"], true);
    /// assert_eq!(results["publish_anything"], false);
    /// ```
    pub fn check_all<K>(&self, checks: &[(K, Action, &[Subject])]) -> HashMap<K, bool>
    where
        K: Clone + Eq + Hash,
    {
        let snapshot = self.snapshot();
        checks
            .iter()
            .map(|(key, action, subjects)| {
                let allowed = subjects.iter().any(|subject| snapshot.can(*action, *subject));
                (key.clone(), allowed)
            })
            .collect()
    }

    fn publish(&self, ticket: RefreshTicket, role: EffectiveRole, resolution: Option<RoleResolution>) -> bool {
        let mut guard = self.write();
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != ticket.generation {
            tracing::warn!(
                generation = ticket.generation,
                latest,
                role = %role,
                "discarding superseded refresh result"
            );
            return false;
        }
        *guard = Arc::new(CapabilitySnapshot::committed(ticket.generation, role, resolution));
        tracing::debug!(generation = ticket.generation, role = %role, "capabilities committed");
        true
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<CapabilitySnapshot>> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
