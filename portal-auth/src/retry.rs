//! Retry utilities for upstream lookups.
//!
//! Role and onboarding lookups go through [`retry_upstream`]: each attempt
//! is bounded by a deadline, retryable failures back off exponentially, and
//! the last error is returned once attempts run out. Callers turn that
//! error into a safe default, so a slow directory never hangs the gate.
//!
//! # Example
//!
//! ```rust
//! use portal_auth::retry::{retry_upstream, RetryPolicy};
//! use portal_auth::AuthError;
//!
//! # async fn example() {
//! let policy = RetryPolicy::no_retry();
//! let result: Result<u32, AuthError> =
//!     retry_upstream(&policy, "example", || async { Ok(7) }).await;
//! assert_eq!(result.unwrap(), 7);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::config::GateConfig;
use crate::error::{AuthError, AuthResult};

/// How an upstream call is attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound on any delay
    pub max_delay: Duration,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,

    /// Deadline for each attempt; `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
            attempt_timeout: Some(Duration::from_secs(15)),
        }
    }
}

impl RetryPolicy {
    /// Policy for access-profile fetches, from the gate configuration.
    pub fn for_role_fetch(config: &GateConfig) -> Self {
        Self {
            max_attempts: config.role_fetch_max_attempts.max(1),
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            exponential_base: 2.0,
            attempt_timeout: Some(config.role_fetch_timeout()),
        }
    }

    /// Policy for onboarding status checks: two attempts, one-second backoff.
    pub fn for_onboarding_check(config: &GateConfig) -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            attempt_timeout: Some(config.role_fetch_timeout()),
        }
    }

    /// Single attempt, no deadline.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 1.0,
            attempt_timeout: None,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Run an upstream call under a [`RetryPolicy`].
///
/// Errors for which [`AuthError::is_retryable`] is false are returned at
/// once. A deadline overrun becomes [`AuthError::Timeout`], which is
/// retryable.
///
/// # Arguments
///
/// * `policy` - Attempts, backoff and per-attempt deadline
/// * `operation` - Name used in log records
/// * `f` - Produces one attempt's future
pub async fn retry_upstream<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut f: F) -> AuthResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AuthResult<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match policy.attempt_timeout {
            Some(deadline) => match timeout(deadline, f()).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout(deadline.as_secs())),
            },
            None => f().await,
        };

        match outcome {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation, attempts = attempt, "Upstream call succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !e.is_retryable() => {
                tracing::debug!(operation, error = %e, "Error is not retryable, returning immediately");
                return Err(e);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(operation, attempts = attempt, error = %e, "All retry attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Upstream attempt failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            exponential_base: 2.0,
            attempt_timeout: Some(Duration::from_millis(50)),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = GateConfig::default();
        let policy = RetryPolicy::for_role_fetch(&config);
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.attempt_timeout, Some(Duration::from_secs(15)));

        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_delay_after_is_capped() {
        let policy = RetryPolicy::for_onboarding_check(&GateConfig::default());
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_succeeds_after_retryable_failure() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_upstream(&quick(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AuthError::DirectoryUnavailable("refused".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: AuthResult<()> = retry_upstream(&quick(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AuthError::NotFound("acc-1".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(AuthError::NotFound(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_becomes_timeout() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: AuthResult<()> = retry_upstream(&quick(2), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(AuthError::Timeout(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
