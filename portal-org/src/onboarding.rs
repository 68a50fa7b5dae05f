//! Organization onboarding status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an organization has finished the onboarding wizard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    /// The status check has not returned yet.
    #[default]
    Pending,
    /// A submitted onboarding record exists.
    Completed,
    /// No onboarding record, or the check failed.
    NotCompleted,
}

impl OnboardingState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::NotCompleted => "not_completed",
        }
    }

    /// Parse state from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" | "complete" => Some(Self::Completed),
            "not_completed" | "not-completed" | "incomplete" => Some(Self::NotCompleted),
            _ => None,
        }
    }

    /// Check if the status check is still in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Check if onboarding is known to be complete.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one onboarding status check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnboardingStatus {
    /// Observed state
    pub state: OnboardingState,

    /// Account the check ran for; empty when none was known
    pub account_id: String,

    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

impl OnboardingStatus {
    /// Record a check result now.
    pub fn new(account_id: impl Into<String>, state: OnboardingState) -> Self {
        Self {
            state,
            account_id: account_id.into(),
            checked_at: Utc::now(),
        }
    }

    /// The status used when no account id is known.
    pub fn without_account() -> Self {
        Self::new(String::new(), OnboardingState::NotCompleted)
    }
}
