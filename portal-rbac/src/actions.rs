//! # Actions
//!
//! Defines the operation kinds a capability can grant on a subject.

use serde::{Deserialize, Serialize};

/// Operations that can be performed on a subject.
///
/// The four CRUD actions cover nearly every route in the portal. The
/// remaining actions are domain-specific and only appear on a handful of
/// subjects:
/// - **Download**: Fetch the underlying file of a document
/// - **Publish** / **Unpublish**: Toggle visibility of help-center content
/// - **Archive**: Retire a record without deleting it
/// - **Approve**: Sign off on a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read/view a subject.
    Read,

    /// Create new records.
    Create,

    /// Modify existing records.
    Update,

    /// Permanently remove records.
    Delete,

    /// Download attached files.
    Download,

    /// Make content visible.
    Publish,

    /// Retire a record.
    Archive,

    /// Sign off on a pending change.
    Approve,

    /// Withdraw published content.
    Unpublish,
}

impl Action {
    /// Number of actions. Sizes the per-subject bitset in
    /// [`CapabilitySet`](crate::permissions::CapabilitySet).
    pub const COUNT: usize = 9;

    /// Every action, in declaration order.
    pub const ALL: [Action; Action::COUNT] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Download,
        Action::Publish,
        Action::Archive,
        Action::Approve,
        Action::Unpublish,
    ];

    /// The mutating CRUD actions.
    pub const MUTATING: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Download => "download",
            Action::Publish => "publish",
            Action::Archive => "archive",
            Action::Approve => "approve",
            Action::Unpublish => "unpublish",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, supports aliases)
    ///
    /// # Returns
    ///
    /// `Some(Action)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("read"), Some(Action::Read));
    /// assert_eq!(Action::parse("view"), Some(Action::Read));
    /// assert_eq!(Action::parse("edit"), Some(Action::Update));
    /// assert_eq!(Action::parse("manage"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "read" | "view" | "get" => Some(Action::Read),
            "create" | "add" | "new" | "submit" => Some(Action::Create),
            "update" | "edit" | "write" | "modify" => Some(Action::Update),
            "delete" | "remove" | "destroy" => Some(Action::Delete),
            "download" | "export" => Some(Action::Download),
            "publish" => Some(Action::Publish),
            "archive" => Some(Action::Archive),
            "approve" | "accept" => Some(Action::Approve),
            "unpublish" => Some(Action::Unpublish),
            _ => None,
        }
    }

    /// Position of this action in [`Action::ALL`]; also its bit index.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Check if this is one of the mutating CRUD actions (create/update/delete).
    pub fn is_mutating(&self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }

    /// Check if this is a destructive action.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Delete)
    }

    /// Check if this action leaves data unchanged.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::Read | Action::Download)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
