//! Backoff schedule for API requests.
//!
//! [`SefariaClient`](super::SefariaClient) consults the policy after every
//! failed HTTP attempt (transport error, 429 or 5xx).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often and how long the API client waits before re-sending a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Requests sent per fetch, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first re-send, in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single wait, in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Growth factor applied to the wait after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    6
}
fn default_initial_delay() -> u64 {
    500
}
fn default_max_delay() -> u64 {
    8000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits, for tests and local mirrors
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Wait after failed attempt `attempt` (1-based): `initial * multiplier^(attempt-1)`, capped
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let wait_ms = (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay_ms as f64);
        Duration::from_millis(wait_ms as u64)
    }

    /// Whether another request may follow failed attempt `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=6)
            .map(|attempt| policy.delay_for_attempt(attempt).as_millis() as u64)
            .collect();
        assert_eq!(waits, vec![500, 1000, 2000, 4000, 8000, 8000]);
    }

    #[test]
    fn test_large_attempts_stay_capped() {
        let policy = RetryPolicy {
            max_delay_ms: 3000,
            ..Default::default()
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_millis(3000));
    }

    #[test]
    fn test_default_allows_five_retries() {
        let policy = RetryPolicy::default();
        assert!((1..6).all(|attempt| policy.should_retry(attempt)));
        assert!(!policy.should_retry(6));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(3), Duration::ZERO);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
