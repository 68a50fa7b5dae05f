//! Role resolution
//!
//! Turns a [`RawRoleSignal`] into an [`EffectiveRole`]. Resolution never
//! fails: anything that cannot be mapped to a canonical role becomes
//! [`EffectiveRole::Unresolved`], with the reason kept on the returned
//! [`RoleResolution`] and written to the audit log.
//!
//! Audit records go to the `portal::role_audit` tracing target:
//! successful resolutions at `info`, unknown or unparseable values at
//! `warn`, and directory roles the portal does not admit at `warn` with
//! `reason = "disallowed"`.

use chrono::{DateTime, Utc};
use portal_rbac::{EffectiveRole, Role};
use serde::{Deserialize, Serialize};

use crate::access::{AccessRoleCode, RawRoleSignal};
use crate::organization::AccessProfile;

/// Tracing target for role resolution audit records.
pub const AUDIT_TARGET: &str = "portal::role_audit";

/// Where a resolved signal came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// Role name claimed by the identity provider.
    Claimed,
    /// The member's profile record.
    Profile,
    /// The organization record.
    Organization,
    /// A signal handed straight to the resolver.
    Direct,
    /// No source carried a value.
    None,
}

impl RoleSource {
    /// Get string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::Profile => "profile",
            Self::Organization => "organization",
            Self::Direct => "direct",
            Self::None => "none",
        }
    }
}

/// Why a signal resolved to unresolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No value was supplied.
    Absent,
    /// The value is not an integer.
    Unparseable {
        /// The offending text
        input: String,
    },
    /// The integer is not a known choice value.
    UnknownCode {
        /// The offending code
        code: i64,
    },
    /// A known directory role outside the canonical set.
    Disallowed {
        /// The directory role
        code: AccessRoleCode,
    },
    /// The role lookup itself failed.
    Unavailable {
        /// Upstream error text
        detail: String,
    },
}

impl UnresolvedReason {
    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Unparseable { .. } => "unparseable",
            Self::UnknownCode { .. } => "unknown_code",
            Self::Disallowed { .. } => "disallowed",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    /// Check if the role was recognized but not admitted.
    pub fn is_disallowed(&self) -> bool {
        matches!(self, Self::Disallowed { .. })
    }
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("no role value supplied"),
            Self::Unparseable { input } => write!(f, "role value {input:?} is not numeric"),
            Self::UnknownCode { code } => write!(f, "role code {code} is not recognized"),
            Self::Disallowed { code } => write!(f, "directory role {code} is not allowed"),
            Self::Unavailable { detail } => write!(f, "role lookup failed: {detail}"),
        }
    }
}

/// The outcome of one resolution, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleResolution {
    /// Input exactly as received
    pub raw: RawRoleSignal,

    /// Which source supplied the input
    pub source: RoleSource,

    /// The role the capability matrix will be evaluated for
    pub role: EffectiveRole,

    /// Present exactly when `role` is unresolved
    pub reason: Option<UnresolvedReason>,

    /// Caller-supplied label for the resolution site
    pub context: String,

    /// When the resolution happened
    pub resolved_at: DateTime<Utc>,
}

impl RoleResolution {
    fn new(
        raw: RawRoleSignal,
        source: RoleSource,
        outcome: Result<Role, UnresolvedReason>,
        context: &str,
    ) -> Self {
        let (role, reason) = match outcome {
            Ok(role) => (EffectiveRole::Known(role), None),
            Err(reason) => (EffectiveRole::Unresolved, Some(reason)),
        };
        Self {
            raw,
            source,
            role,
            reason,
            context: context.to_string(),
            resolved_at: Utc::now(),
        }
    }

    /// Record a lookup that failed before any signal was seen.
    ///
    /// The result is unresolved and is audited like any other resolution.
    pub fn unavailable(detail: impl Into<String>, context: &str) -> Self {
        Self::new(
            RawRoleSignal::Absent,
            RoleSource::None,
            Err(UnresolvedReason::Unavailable {
                detail: detail.into(),
            }),
            context,
        )
        .audit()
    }

    /// Check if a canonical role was produced.
    pub fn is_resolved(&self) -> bool {
        self.role.is_resolved()
    }

    fn audit(self) -> Self {
        match &self.reason {
            None => tracing::info!(
                target: AUDIT_TARGET,
                raw = %self.raw,
                role = %self.role,
                source = self.source.as_str(),
                context = %self.context,
                "role resolved"
            ),
            Some(reason @ UnresolvedReason::Disallowed { code }) => tracing::warn!(
                target: AUDIT_TARGET,
                raw = %self.raw,
                role = %self.role,
                directory_role = code.as_str(),
                source = self.source.as_str(),
                context = %self.context,
                reason = reason.as_str(),
                "role recognized but not allowed"
            ),
            Some(UnresolvedReason::Absent) => tracing::info!(
                target: AUDIT_TARGET,
                raw = %self.raw,
                role = %self.role,
                source = self.source.as_str(),
                context = %self.context,
                reason = "absent",
                "no role value available"
            ),
            Some(reason) => tracing::warn!(
                target: AUDIT_TARGET,
                raw = %self.raw,
                role = %self.role,
                source = self.source.as_str(),
                context = %self.context,
                reason = reason.as_str(),
                detail = %reason,
                "role value could not be resolved"
            ),
        }
        self
    }
}

/// Maps raw role signals to effective roles.
///
/// # Examples
///
/// ```
/// use portal_org::{RawRoleSignal, RoleResolver};
/// use portal_rbac::{EffectiveRole, Role};
///
/// let resolved = RoleResolver::resolve(&RawRoleSignal::from("123,950,000"), "doc");
/// assert_eq!(resolved.role, EffectiveRole::Known(Role::Admin));
///
/// let unknown = RoleResolver::resolve(&RawRoleSignal::Integer(999_999_999), "doc");
/// assert_eq!(unknown.role, EffectiveRole::Unresolved);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleResolver;

impl RoleResolver {
    /// Extract the numeric code from a signal.
    ///
    /// Text has `,` separators and whitespace removed before parsing.
    pub fn parse_code(raw: &RawRoleSignal) -> Result<i64, UnresolvedReason> {
        match raw {
            RawRoleSignal::Absent => Err(UnresolvedReason::Absent),
            RawRoleSignal::Integer(code) => Ok(*code),
            RawRoleSignal::Text(text) => {
                let digits: String = text
                    .chars()
                    .filter(|c| *c != ',' && !c.is_whitespace())
                    .collect();
                if digits.is_empty() {
                    return Err(UnresolvedReason::Absent);
                }
                digits.parse().map_err(|_| UnresolvedReason::Unparseable {
                    input: text.clone(),
                })
            }
        }
    }

    /// Resolve one signal.
    ///
    /// # Arguments
    ///
    /// * `raw` - The untrusted signal
    /// * `context` - Label for the audit record (e.g. `"session:refresh"`)
    pub fn resolve(raw: &RawRoleSignal, context: &str) -> RoleResolution {
        Self::resolve_from(RoleSource::Direct, raw, context)
    }

    /// Resolve the role for an identity's access profile.
    ///
    /// A claimed role name that is already canonical wins. Otherwise the
    /// profile's signal is used when present, then the organization's. A
    /// present but invalid signal is not skipped in favour of the next source.
    pub fn resolve_profile(profile: &AccessProfile, context: &str) -> RoleResolution {
        if let Some(claimed) = profile.claimed_role.as_deref() {
            if let Some(role) = Role::parse(claimed) {
                return RoleResolution::new(
                    RawRoleSignal::from(claimed),
                    RoleSource::Claimed,
                    Ok(role),
                    context,
                )
                .audit();
            }
            tracing::debug!(
                target: AUDIT_TARGET,
                claimed,
                context,
                "claimed role is not canonical, falling back to directory records"
            );
        }

        if let Some(record) = profile.profile.as_ref().filter(|p| !p.access_role.is_absent()) {
            return Self::resolve_from(RoleSource::Profile, &record.access_role, context);
        }

        if let Some(org) = profile
            .organization
            .as_ref()
            .filter(|o| !o.access_role.is_absent())
        {
            return Self::resolve_from(RoleSource::Organization, &org.access_role, context);
        }

        RoleResolution::new(
            RawRoleSignal::Absent,
            RoleSource::None,
            Err(UnresolvedReason::Absent),
            context,
        )
        .audit()
    }

    fn resolve_from(source: RoleSource, raw: &RawRoleSignal, context: &str) -> RoleResolution {
        let outcome = Self::parse_code(raw).and_then(|code| {
            let known = AccessRoleCode::from_code(code).ok_or(UnresolvedReason::UnknownCode { code })?;
            known
                .canonical()
                .ok_or(UnresolvedReason::Disallowed { code: known })
        });
        RoleResolution::new(raw.clone(), source, outcome, context).audit()
    }
}
