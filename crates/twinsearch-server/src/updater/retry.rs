//! Retry policy for transient store failures.

use std::time::Duration;

use super::types::UpdaterError;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// True if an item that has made `attempts` attempts may try again.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay after the `attempts`-th failed attempt: doubles every attempt,
    /// capped at `max_backoff`.
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn validate(&self) -> Result<(), UpdaterError> {
        if self.max_attempts == 0 {
            return Err(UpdaterError::InvalidConfig {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        if self.initial_backoff > self.max_backoff {
            return Err(UpdaterError::InvalidConfig {
                message: "initial_backoff must not exceed max_backoff".to_string(),
            });
        }
        Ok(())
    }
}
