//! Gate configuration.
//!
//! Runtime knobs for the authorization gate and capability refresh. Loaded
//! from environment variables with defaults that match the portal's routes.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration for [`AuthorizationGate`](crate::AuthorizationGate) and
/// [`CapabilityContext`](crate::CapabilityContext).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    /// Where redirected navigations land.
    pub landing_route: String,

    /// The onboarding wizard route.
    pub onboarding_route: String,

    /// Where to send unauthenticated visitors when auto sign-in is off.
    pub sign_in_route: String,

    /// Request sign-in automatically for unauthenticated visitors.
    pub auto_sign_in: bool,

    /// Treat every session as admin without fetching a role.
    pub demo_mode: bool,

    /// Send admins with incomplete onboarding to the wizard first.
    pub onboarding_first: bool,

    /// Let admins reopen onboarding after completing it (`?revisit=true`).
    pub allow_onboarding_revisit: bool,

    /// Deadline for one role fetch attempt, in seconds.
    pub role_fetch_timeout_secs: u64,

    /// Total attempts for a role fetch, including the first.
    pub role_fetch_max_attempts: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            landing_route: "/dashboard/overview".to_string(),
            onboarding_route: "/dashboard/onboarding".to_string(),
            sign_in_route: "/".to_string(),
            auto_sign_in: true,
            demo_mode: false,
            onboarding_first: false,
            allow_onboarding_revisit: true,
            role_fetch_timeout_secs: 15,
            role_fetch_max_attempts: 2,
        }
    }
}

impl GateConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORTAL_LANDING_ROUTE`: Redirect target (default: /dashboard/overview)
    /// - `PORTAL_ONBOARDING_ROUTE`: Onboarding route (default: /dashboard/onboarding)
    /// - `PORTAL_SIGN_IN_ROUTE`: Sign-in route (default: /)
    /// - `PORTAL_AUTO_SIGN_IN`: Request sign-in automatically (default: true)
    /// - `PORTAL_DEMO_MODE`: Demo mode (default: false)
    /// - `PORTAL_ONBOARDING_FIRST`: Onboarding-first redirect (default: false)
    /// - `PORTAL_ALLOW_ONBOARDING_REVISIT`: Allow `?revisit=true` (default: true)
    /// - `PORTAL_ROLE_FETCH_TIMEOUT_SECS`: Per-attempt timeout (default: 15)
    /// - `PORTAL_ROLE_FETCH_MAX_ATTEMPTS`: Attempts per fetch (default: 2)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            landing_route: std::env::var("PORTAL_LANDING_ROUTE").unwrap_or(default.landing_route),
            onboarding_route: std::env::var("PORTAL_ONBOARDING_ROUTE")
                .unwrap_or(default.onboarding_route),
            sign_in_route: std::env::var("PORTAL_SIGN_IN_ROUTE").unwrap_or(default.sign_in_route),
            auto_sign_in: env_flag("PORTAL_AUTO_SIGN_IN").unwrap_or(default.auto_sign_in),
            demo_mode: env_flag("PORTAL_DEMO_MODE").unwrap_or(default.demo_mode),
            onboarding_first: env_flag("PORTAL_ONBOARDING_FIRST")
                .unwrap_or(default.onboarding_first),
            allow_onboarding_revisit: env_flag("PORTAL_ALLOW_ONBOARDING_REVISIT")
                .unwrap_or(default.allow_onboarding_revisit),
            role_fetch_timeout_secs: std::env::var("PORTAL_ROLE_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.role_fetch_timeout_secs),
            role_fetch_max_attempts: std::env::var("PORTAL_ROLE_FETCH_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.role_fetch_max_attempts),
        }
    }

    /// Per-attempt role fetch timeout as a Duration.
    pub fn role_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.role_fetch_timeout_secs)
    }

    /// Check that routes are absolute and limits are non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, route) in [
            ("PORTAL_LANDING_ROUTE", &self.landing_route),
            ("PORTAL_ONBOARDING_ROUTE", &self.onboarding_route),
            ("PORTAL_SIGN_IN_ROUTE", &self.sign_in_route),
        ] {
            if !route.starts_with('/') {
                return Err(ConfigError::invalid(key, format!("route {route:?} must start with '/'")));
            }
        }
        if self.landing_route == self.onboarding_route {
            return Err(ConfigError::invalid(
                "PORTAL_LANDING_ROUTE",
                "landing route must differ from the onboarding route",
            ));
        }
        if self.role_fetch_timeout_secs == 0 {
            return Err(ConfigError::invalid("PORTAL_ROLE_FETCH_TIMEOUT_SECS", "must be at least 1"));
        }
        if self.role_fetch_max_attempts == 0 {
            return Err(ConfigError::invalid("PORTAL_ROLE_FETCH_MAX_ATTEMPTS", "must be at least 1"));
        }
        Ok(())
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|s| s != "false" && s != "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.landing_route, "/dashboard/overview");
        assert_eq!(config.onboarding_route, "/dashboard/onboarding");
        assert!(config.auto_sign_in);
        assert!(!config.demo_mode);
        assert!(!config.onboarding_first);
        assert!(config.allow_onboarding_revisit);
        assert_eq!(config.role_fetch_timeout(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_routes() {
        let config = GateConfig {
            landing_route: "dashboard".to_string(),
            ..GateConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PORTAL_LANDING_ROUTE"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = GateConfig {
            role_fetch_timeout_secs: 0,
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GateConfig {
            role_fetch_max_attempts: 0,
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_landing_equal_to_onboarding() {
        let config = GateConfig {
            landing_route: "/dashboard/onboarding".to_string(),
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
