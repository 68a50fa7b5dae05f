//! # Capabilities
//!
//! Core capability types and sets for the portal RBAC system.
//! A capability combines a subject with an action.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::subjects::Subject;

/// A capability is a combination of subject and action.
///
/// # Example
///
/// ```
/// use portal_rbac::permissions::Capability;
/// use portal_rbac::subjects::Subject;
/// use portal_rbac::actions::Action;
///
/// let cap = Capability::new(Subject::Documents, Action::Read);
/// assert_eq!(cap.to_string(), "user-documents:read");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability {
    /// The subject this capability applies to.
    pub subject: Subject,
    /// The action allowed on the subject.
    pub action: Action,
}

impl Capability {
    /// Create a new capability.
    pub const fn new(subject: Subject, action: Action) -> Self {
        Self { subject, action }
    }

    /// Parse from string (e.g., "user-documents:read").
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::permissions::Capability;
    /// use portal_rbac::subjects::Subject;
    /// use portal_rbac::actions::Action;
    ///
    /// let cap = Capability::from_string("user-forms:create").unwrap();
    /// assert_eq!(cap, Capability::new(Subject::Forms, Action::Create));
    /// assert!(Capability::from_string("user-forms").is_none());
    /// ```
    pub fn from_string(s: &str) -> Option<Self> {
        let (subject, action) = s.split_once(':')?;
        Some(Self {
            subject: Subject::parse(subject)?,
            action: Action::parse(action)?,
        })
    }

    /// Every capability, subject-major.
    pub fn all() -> impl Iterator<Item = Capability> {
        Subject::ALL
            .into_iter()
            .flat_map(|subject| Action::ALL.into_iter().map(move |action| Capability::new(subject, action)))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.subject.as_str(), self.action.as_str())
    }
}

/// Outcome of looking a capability up in a [`CapabilitySet`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The capability is granted.
    Allow,
    /// The capability is refused (explicitly or by absence of a rule).
    Deny,
}

impl Decision {
    /// Check if this decision grants access.
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// A total allow/deny function over every capability.
///
/// Stored as one action bitmask per subject. Any capability not set is
/// denied, so the empty set is the "deny everything" set.
///
/// # Example
///
/// ```
/// use portal_rbac::permissions::{Capability, CapabilitySet, Decision};
/// use portal_rbac::subjects::Subject;
/// use portal_rbac::actions::Action;
///
/// let mut set = CapabilitySet::deny_all();
/// set.allow(Capability::new(Subject::Documents, Action::Read));
///
/// assert!(set.can(Action::Read, Subject::Documents));
/// assert_eq!(set.decision(Capability::new(Subject::Documents, Action::Delete)), Decision::Deny);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CapabilitySet {
    grants: [u16; Subject::COUNT],
}

impl CapabilitySet {
    /// The set that denies every capability.
    pub const fn deny_all() -> Self {
        Self {
            grants: [0; Subject::COUNT],
        }
    }

    /// Grant a capability.
    pub fn allow(&mut self, capability: Capability) {
        self.grants[capability.subject.index()] |= Self::bit(capability.action);
    }

    /// Revoke a capability.
    ///
    /// # Returns
    ///
    /// `true` if the capability was previously granted
    pub fn revoke(&mut self, capability: Capability) -> bool {
        let slot = &mut self.grants[capability.subject.index()];
        let was_set = *slot & Self::bit(capability.action) != 0;
        *slot &= !Self::bit(capability.action);
        was_set
    }

    /// Revoke every capability.
    pub fn clear(&mut self) {
        self.grants = [0; Subject::COUNT];
    }

    /// Check if a capability is granted.
    pub fn allows(&self, capability: Capability) -> bool {
        self.grants[capability.subject.index()] & Self::bit(capability.action) != 0
    }

    /// Check whether `action` may be performed on `subject`.
    pub fn can(&self, action: Action, subject: Subject) -> bool {
        self.allows(Capability::new(subject, action))
    }

    /// Look up the decision for a capability.
    pub fn decision(&self, capability: Capability) -> Decision {
        if self.allows(capability) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// Every capability paired with its decision, subject-major.
    pub fn decisions(&self) -> impl Iterator<Item = (Capability, Decision)> + '_ {
        Capability::all().map(move |cap| (cap, self.decision(cap)))
    }

    /// All granted capabilities.
    pub fn allowed(&self) -> Vec<Capability> {
        Capability::all().filter(|cap| self.allows(*cap)).collect()
    }

    /// Actions granted on one subject.
    pub fn actions_on(&self, subject: Subject) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.can(*action, subject))
            .collect()
    }

    /// Number of granted capabilities.
    pub fn len(&self) -> usize {
        self.grants.iter().map(|mask| mask.count_ones() as usize).sum()
    }

    /// Check if nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.grants.iter().all(|mask| *mask == 0)
    }

    /// Check if this set grants everything `other` grants.
    pub fn contains_all(&self, other: &CapabilitySet) -> bool {
        self.grants
            .iter()
            .zip(other.grants.iter())
            .all(|(mine, theirs)| theirs & !mine == 0)
    }

    /// Check if this set grants at least one capability from `other`.
    pub fn contains_any(&self, other: &CapabilitySet) -> bool {
        self.grants
            .iter()
            .zip(other.grants.iter())
            .any(|(mine, theirs)| mine & theirs != 0)
    }

    /// Capabilities granted here but not in `other`.
    pub fn difference(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut grants = [0; Subject::COUNT];
        for (i, slot) in grants.iter_mut().enumerate() {
            *slot = self.grants[i] & !other.grants[i];
        }
        CapabilitySet { grants }
    }

    fn bit(action: Action) -> u16 {
        1 << action.index()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = CapabilitySet::deny_all();
        for cap in iter {
            set.allow(cap);
        }
        set
    }
}
