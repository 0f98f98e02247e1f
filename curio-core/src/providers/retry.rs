//! Retry policy for provider calls
//!
//! The policy decides, per failed attempt, whether to try again and how long
//! to wait first. It holds configuration only; attempt counters live in the
//! engine and die with the invocation.

use crate::config::ValidationError;
use crate::providers::error::InvocationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Backoff base; attempt `n` waits `base_delay_ms * 2^n`
    pub base_delay_ms: u64,

    /// Upper bound on a provider-supplied rate-limit cooldown
    pub max_retry_after_secs: u64,

    /// Jitter factor (0.0 to 1.0) applied to computed backoff delays
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_retry_after_secs: 120,
            jitter_factor: 0.0,
        }
    }
}

/// What the engine does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then attempt again
    Retry(Duration),
    /// Propagate the error to the caller
    GiveUp,
}

impl RetryPolicy {
    /// Exponential backoff for a zero-indexed attempt: 1s, 2s, 4s with defaults
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let base = self.base_delay_ms.saturating_mul(factor) as f64;

        let delay = if self.jitter_factor > 0.0 {
            let range = base * self.jitter_factor;
            let jitter = rand::thread_rng().gen_range(-range..=range);
            (base + jitter).max(0.0)
        } else {
            base
        };

        Duration::from_millis(delay as u64)
    }

    /// Cooldown after a rate limit: the provider hint clamped to
    /// `max_retry_after_secs`, or the regular backoff when there is no hint
    pub fn rate_limit_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(Duration::from_secs(self.max_retry_after_secs)),
            None => self.backoff_delay(attempt),
        }
    }

    /// Decide what follows a failed zero-indexed `attempt`
    pub fn decide(&self, error: &InvocationError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() || attempt + 1 >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        match error {
            InvocationError::RateLimited { retry_after, .. } => {
                RetryDecision::Retry(self.rate_limit_delay(attempt, *retry_after))
            }
            _ => RetryDecision::Retry(self.backoff_delay(attempt)),
        }
    }

    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_attempts", path),
                "Must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ValidationError::out_of_range(
                format!("{}.jitter_factor", path),
                "Must be between 0.0 and 1.0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_retry_after_secs, 120);
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff_delay(200) > Duration::from_secs(1_000_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            jitter_factor: 0.5,
            ..Default::default()
        };

        for _ in 0..50 {
            let delay = policy.backoff_delay(0).as_millis();
            assert!((500..=1500).contains(&delay));
        }
    }

    #[test]
    fn test_rate_limit_hint_respected_and_clamped() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.rate_limit_delay(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.rate_limit_delay(0, Some(Duration::from_secs(86_400))),
            Duration::from_secs(120)
        );
        assert_eq!(policy.rate_limit_delay(1, None), Duration::from_secs(2));
    }

    #[test]
    fn test_decide_never_retries_fatal_kinds() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(&InvocationError::missing_credential("m"), 0),
            RetryDecision::GiveUp
        );
        assert_eq!(
            policy.decide(&InvocationError::invalid_structured_output("bad", "raw"), 0),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_decide_gives_up_on_final_attempt() {
        let policy = RetryPolicy::default();
        let timeout = InvocationError::timed_out("deadline");

        assert_eq!(policy.decide(&timeout, 0), RetryDecision::Retry(Duration::from_secs(1)));
        assert_eq!(policy.decide(&timeout, 1), RetryDecision::Retry(Duration::from_secs(2)));
        assert_eq!(policy.decide(&timeout, 2), RetryDecision::GiveUp);

        let limited = InvocationError::rate_limited("429", Some(Duration::from_secs(5)));
        assert_eq!(policy.decide(&limited, 1), RetryDecision::Retry(Duration::from_secs(5)));
        assert_eq!(policy.decide(&limited, 2), RetryDecision::GiveUp);
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        };
        assert_eq!(
            policy.decide(&InvocationError::provider("boom"), 0),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(policy.validate("retry").is_err());
    }
}
