//! Error types for portal authorization
//!
//! This module defines the errors that can occur while fetching identity,
//! access profiles and onboarding status from upstream services. None of
//! them reach a navigation decision directly: a failed role fetch degrades
//! to the unresolved role, and a failed onboarding check degrades to
//! "not completed".

use thiserror::Error;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authenticated identity is available
    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// The directory service could not be reached
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// An upstream call exceeded its deadline
    #[error("Upstream call timed out after {0}s")]
    Timeout(u64),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The upstream service answered with an error status
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        /// HTTP-style status code
        status: u16,
        /// Upstream message
        message: String,
    },

    /// A refresh was superseded by a newer one
    #[error("Refresh superseded by a newer request")]
    Superseded,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        match self {
            AuthError::Upstream { status, .. } => *status >= 500,
            AuthError::Internal(_) | AuthError::ConfigError(_) => true,
            _ => false,
        }
    }

    /// Check if retrying the call may succeed.
    ///
    /// Transport failures, timeouts and 5xx/429 answers are retryable.
    /// Missing records and client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::DirectoryUnavailable(_) | AuthError::Timeout(_) => true,
            AuthError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::IdentityUnavailable(_) => 401,
            AuthError::NotFound(_) => 404,
            AuthError::Superseded => 409,
            AuthError::Upstream { status, .. } => *status,
            AuthError::DirectoryUnavailable(_) => 503,
            AuthError::Timeout(_) => 504,
            AuthError::ConfigError(_) | AuthError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::IdentityUnavailable(_) => "IDENTITY_UNAVAILABLE",
            AuthError::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
            AuthError::Timeout(_) => "TIMEOUT",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Upstream { .. } => "UPSTREAM_ERROR",
            AuthError::Superseded => "SUPERSEDED",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<crate::config::ConfigError> for AuthError {
    fn from(err: crate::config::ConfigError) -> Self {
        AuthError::ConfigError(err.to_string())
    }
}
