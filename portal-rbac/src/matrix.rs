//! # Capability Matrix
//!
//! Maps an [`EffectiveRole`] to its complete [`CapabilitySet`].
//!
//! Each role is described as an ordered list of allow/deny rules. Compiling
//! the list is order-independent: a capability is granted only if some rule
//! allows it and no rule denies it, and a catch-all deny clears everything.
//!
//! ```text
//!              onboarding  workspace CRUD  delete  self-service      public
//! admin        r c u       r c u           yes     profile r u,      read
//!                                                  settings r c u
//! creator      -           r c u           -       same as admin     read
//! approver     -           r c u           -       same as admin     read
//! viewer       -           r               -       profile r u,      read
//!                                                  settings r
//! unresolved   -           -               -       -                 -
//! ```

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::permissions::{Capability, CapabilitySet};
use crate::roles::{EffectiveRole, Role};
use crate::subjects::{Subject, SubjectArea};

/// Subjects that carry full create/read/update/delete semantics.
const CONTENT_SUBJECTS: [Subject; 4] = [
    Subject::Documents,
    Subject::Requests,
    Subject::Reporting,
    Subject::Forms,
];

const PUBLIC_SUBJECTS: [Subject; 2] = [Subject::Marketplace, Subject::PublicContent];

const ONBOARDING_ACTIONS: [Action; 3] = [Action::Read, Action::Create, Action::Update];

/// A single policy statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Grant one capability.
    Allow(Capability),
    /// Refuse one capability; beats any `Allow`.
    Deny(Capability),
    /// Refuse every capability.
    DenyAll,
}

/// Ordered rule list for one role.
///
/// # Example
///
/// ```
/// use portal_rbac::matrix::PolicyRules;
/// use portal_rbac::{Action, Subject};
///
/// let mut rules = PolicyRules::new();
/// rules
///     .can(&[Action::Read, Action::Update], &[Subject::Profile])
///     .cannot(&[Action::Update], &[Subject::Profile]);
///
/// let set = rules.compile();
/// assert!(set.can(Action::Read, Subject::Profile));
/// assert!(!set.can(Action::Update, Subject::Profile));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRules {
    rules: Vec<Rule>,
}

impl PolicyRules {
    /// Create an empty rule list (compiles to deny-all).
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Allow every listed action on every listed subject.
    pub fn can(&mut self, actions: &[Action], subjects: &[Subject]) -> &mut Self {
        for subject in subjects {
            for action in actions {
                self.rules.push(Rule::Allow(Capability::new(*subject, *action)));
            }
        }
        self
    }

    /// Deny every listed action on every listed subject.
    pub fn cannot(&mut self, actions: &[Action], subjects: &[Subject]) -> &mut Self {
        for subject in subjects {
            for action in actions {
                self.rules.push(Rule::Deny(Capability::new(*subject, *action)));
            }
        }
        self
    }

    /// Deny everything, regardless of other rules.
    pub fn cannot_anything(&mut self) -> &mut Self {
        self.rules.push(Rule::DenyAll);
        self
    }

    /// The rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Compile to a total capability set. Deny wins over allow.
    pub fn compile(&self) -> CapabilitySet {
        let mut allowed = CapabilitySet::deny_all();
        let mut denied = CapabilitySet::deny_all();

        for rule in &self.rules {
            match rule {
                Rule::Allow(cap) => allowed.allow(*cap),
                Rule::Deny(cap) => denied.allow(*cap),
                Rule::DenyAll => return CapabilitySet::deny_all(),
            }
        }

        allowed.difference(&denied)
    }
}

/// Builds capability sets from roles.
///
/// The build is pure, so results are memoized per role in a process-wide
/// table; [`CapabilityMatrixBuilder::shared`] hands out the cached instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityMatrixBuilder;

impl CapabilityMatrixBuilder {
    /// The rule list for a role.
    pub fn rules_for(role: EffectiveRole) -> PolicyRules {
        match role {
            EffectiveRole::Known(Role::Admin) => admin_rules(),
            EffectiveRole::Known(Role::Creator) | EffectiveRole::Known(Role::Approver) => editor_rules(),
            EffectiveRole::Known(Role::Viewer) => viewer_rules(),
            EffectiveRole::Unresolved => unresolved_rules(),
        }
    }

    /// Compute the capability set for a role.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::{Action, CapabilityMatrixBuilder, EffectiveRole, Role, Subject};
    ///
    /// let admin = CapabilityMatrixBuilder::build(Role::Admin.into());
    /// assert!(admin.can(Action::Read, Subject::Onboarding));
    ///
    /// let unresolved = CapabilityMatrixBuilder::build(EffectiveRole::Unresolved);
    /// assert!(unresolved.is_empty());
    /// ```
    pub fn build(role: EffectiveRole) -> CapabilitySet {
        Self::rules_for(role).compile()
    }

    /// The memoized capability set for a role.
    pub fn shared(role: EffectiveRole) -> Arc<CapabilitySet> {
        static MATRIX: OnceLock<[Arc<CapabilitySet>; 5]> = OnceLock::new();
        let table = MATRIX.get_or_init(|| {
            std::array::from_fn(|i| Arc::new(Self::build(EffectiveRole::ALL[i])))
        });
        Arc::clone(&table[role.index()])
    }
}

/// Grants common to every role that may work in the dashboard.
fn workspace_grants(rules: &mut PolicyRules) {
    rules
        .can(&[Action::Read], &[Subject::Dashboard])
        .can(&[Action::Read, Action::Create, Action::Update], &CONTENT_SUBJECTS)
        .can(&[Action::Read, Action::Update], &[Subject::Profile])
        .can(&[Action::Read, Action::Create, Action::Update], &[Subject::Settings])
        .can(&[Action::Read, Action::Update], &[Subject::HelpCenter])
        .can(&[Action::Read], &PUBLIC_SUBJECTS);
}

fn admin_rules() -> PolicyRules {
    let mut rules = PolicyRules::new();
    workspace_grants(&mut rules);
    rules
        .can(&ONBOARDING_ACTIONS, &[Subject::Onboarding])
        .can(&[Action::Delete], &CONTENT_SUBJECTS)
        .can(&[Action::Download], &[Subject::Documents]);
    rules
}

/// Creator and approver: full CRUD minus delete, minus onboarding.
fn editor_rules() -> PolicyRules {
    let mut rules = PolicyRules::new();
    workspace_grants(&mut rules);
    rules.cannot(&ONBOARDING_ACTIONS, &[Subject::Onboarding]);
    rules
}

fn viewer_rules() -> PolicyRules {
    let workspace: Vec<Subject> = Subject::in_area(SubjectArea::Workspace).collect();

    let mut rules = PolicyRules::new();
    rules
        .can(&[Action::Read], &workspace)
        .can(&[Action::Read], &[Subject::Profile, Subject::Settings])
        .can(&[Action::Update], &[Subject::Profile])
        .can(&[Action::Read], &PUBLIC_SUBJECTS)
        .cannot(&Action::MUTATING, &workspace)
        .cannot(&[Action::Create, Action::Delete], &[Subject::Profile])
        .cannot(&Action::MUTATING, &[Subject::Settings])
        .cannot(&Action::ALL, &[Subject::Onboarding]);
    rules
}

fn unresolved_rules() -> PolicyRules {
    let mut rules = PolicyRules::new();
    rules
        .cannot(&[Action::Read], &Subject::ALL)
        .cannot(&Action::ALL, &[Subject::Onboarding])
        .cannot_anything();
    rules
}
