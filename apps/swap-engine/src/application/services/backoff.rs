//! Retry backoff for failed order attempts.
//!
//! Delays double with every failed attempt:
//!
//! | Failed attempt | Delay (base 1s) |
//! |----------------|-----------------|
//! | 1 | 1s |
//! | 2 | 2s |
//! | 3 | 4s |

use std::time::Duration;

/// Exponential retry policy for queued orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per order, including the first (default: 3).
    pub max_attempts: u32,
    /// Delay after the first failed attempt (default: 1s).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based):
    /// `base * 2^(attempt - 1)`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Whether another attempt may follow failed attempt number `attempt`.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
