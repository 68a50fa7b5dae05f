//! # Subjects
//!
//! Defines the protected resource domains of the portal.
//! Subjects are grouped into areas that decide how the role matrix treats them.

use serde::{Deserialize, Serialize};

/// Area of the portal a subject belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubjectArea {
    /// First-run organization onboarding (admin only).
    Onboarding,
    /// Day-to-day dashboard work: documents, requests, reporting, forms.
    Workspace,
    /// The signed-in user's own profile and settings.
    SelfService,
    /// Public marketplace content; listed for completeness, never gated.
    Public,
}

impl SubjectArea {
    /// Get the string representation of the area.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectArea::Onboarding => "onboarding",
            SubjectArea::Workspace => "workspace",
            SubjectArea::SelfService => "self_service",
            SubjectArea::Public => "public",
        }
    }
}

/// Subjects that capabilities are granted on.
///
/// Organized by area:
/// - **Onboarding**: Onboarding
/// - **Workspace**: Dashboard, Forms, Documents, Requests, Reporting, HelpCenter
/// - **SelfService**: Profile, Settings
/// - **Public**: Marketplace, PublicContent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subject {
    /// Organization onboarding wizard.
    #[serde(rename = "onboarding")]
    Onboarding,
    /// Dashboard overview, support and chat-support pages.
    #[serde(rename = "user-dashboard")]
    Dashboard,
    /// Service request forms.
    #[serde(rename = "user-forms")]
    Forms,
    /// Organization documents.
    #[serde(rename = "user-documents")]
    Documents,
    /// Submitted service requests.
    #[serde(rename = "user-requests")]
    Requests,
    /// Reporting obligations.
    #[serde(rename = "user-reporting")]
    Reporting,
    /// The user's own profile.
    #[serde(rename = "user-profile")]
    Profile,
    /// The user's account settings.
    #[serde(rename = "user-settings")]
    Settings,
    /// Help-center articles.
    #[serde(rename = "user-help-center")]
    HelpCenter,
    /// Marketplace listings.
    #[serde(rename = "marketplace")]
    Marketplace,
    /// Other public pages.
    #[serde(rename = "public-content")]
    PublicContent,
}

impl Subject {
    /// Number of subjects. Sizes the bitset in
    /// [`CapabilitySet`](crate::permissions::CapabilitySet).
    pub const COUNT: usize = 11;

    /// Every subject, in declaration order.
    pub const ALL: [Subject; Subject::COUNT] = [
        Subject::Onboarding,
        Subject::Dashboard,
        Subject::Forms,
        Subject::Documents,
        Subject::Requests,
        Subject::Reporting,
        Subject::Profile,
        Subject::Settings,
        Subject::HelpCenter,
        Subject::Marketplace,
        Subject::PublicContent,
    ];

    /// Get the wire representation of the subject.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Onboarding => "onboarding",
            Subject::Dashboard => "user-dashboard",
            Subject::Forms => "user-forms",
            Subject::Documents => "user-documents",
            Subject::Requests => "user-requests",
            Subject::Reporting => "user-reporting",
            Subject::Profile => "user-profile",
            Subject::Settings => "user-settings",
            Subject::HelpCenter => "user-help-center",
            Subject::Marketplace => "marketplace",
            Subject::PublicContent => "public-content",
        }
    }

    /// Human-readable noun used in denial messages ("read documents").
    pub fn label(&self) -> &'static str {
        match self {
            Subject::Onboarding => "onboarding",
            Subject::Dashboard => "the dashboard",
            Subject::Forms => "forms",
            Subject::Documents => "documents",
            Subject::Requests => "requests",
            Subject::Reporting => "reporting obligations",
            Subject::Profile => "your profile",
            Subject::Settings => "settings",
            Subject::HelpCenter => "the help center",
            Subject::Marketplace => "the marketplace",
            Subject::PublicContent => "public content",
        }
    }

    /// Get the area this subject belongs to.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::subjects::{Subject, SubjectArea};
    ///
    /// assert_eq!(Subject::Onboarding.area(), SubjectArea::Onboarding);
    /// assert_eq!(Subject::Documents.area(), SubjectArea::Workspace);
    /// assert_eq!(Subject::Profile.area(), SubjectArea::SelfService);
    /// assert_eq!(Subject::Marketplace.area(), SubjectArea::Public);
    /// ```
    pub fn area(&self) -> SubjectArea {
        match self {
            Subject::Onboarding => SubjectArea::Onboarding,
            Subject::Dashboard
            | Subject::Forms
            | Subject::Documents
            | Subject::Requests
            | Subject::Reporting
            | Subject::HelpCenter => SubjectArea::Workspace,
            Subject::Profile | Subject::Settings => SubjectArea::SelfService,
            Subject::Marketplace | Subject::PublicContent => SubjectArea::Public,
        }
    }

    /// Parse subject from string representation.
    ///
    /// Accepts the wire form (`user-documents`) as well as the bare noun
    /// (`documents`), with `-` and `_` treated alike.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_rbac::subjects::Subject;
    ///
    /// assert_eq!(Subject::parse("user-documents"), Some(Subject::Documents));
    /// assert_eq!(Subject::parse("documents"), Some(Subject::Documents));
    /// assert_eq!(Subject::parse("help_center"), Some(Subject::HelpCenter));
    /// assert_eq!(Subject::parse("all"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let bare = normalized.strip_prefix("user-").unwrap_or(&normalized);
        match bare {
            "onboarding" => Some(Subject::Onboarding),
            "dashboard" => Some(Subject::Dashboard),
            "forms" | "form" => Some(Subject::Forms),
            "documents" | "document" | "docs" => Some(Subject::Documents),
            "requests" | "request" => Some(Subject::Requests),
            "reporting" | "reports" | "reporting-obligations" => Some(Subject::Reporting),
            "profile" => Some(Subject::Profile),
            "settings" | "setting" => Some(Subject::Settings),
            "help-center" | "helpcenter" => Some(Subject::HelpCenter),
            "marketplace" => Some(Subject::Marketplace),
            "public-content" => Some(Subject::PublicContent),
            _ => None,
        }
    }

    /// Position of this subject in [`Subject::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// All subjects in the given area.
    pub fn in_area(area: SubjectArea) -> impl Iterator<Item = Subject> {
        Subject::ALL.into_iter().filter(move |s| s.area() == area)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
