//! Simulation Ports (Driven Ports)
//!
//! Randomness and time are injected so venue simulation, build delays and
//! retry backoff can be driven deterministically in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A delay was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Source of uniform random values.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&self) -> f64;

    /// Fill a buffer with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Uniform integer in `[low, high]`.
    fn next_in_range(&self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let offset = (self.next_unit() * (high - low + 1) as f64).floor() as i64;
        (low + offset).min(high)
    }

    /// Uniform duration in `[min, max]` at millisecond resolution.
    fn next_duration(&self, min: Duration, max: Duration) -> Duration {
        let low = i64::try_from(min.as_millis()).unwrap_or(i64::MAX);
        let high = i64::try_from(max.as_millis()).unwrap_or(i64::MAX);
        let millis = self.next_in_range(low, high);
        Duration::from_millis(u64::try_from(millis).unwrap_or_default())
    }

    /// True with probability `p`.
    fn chance(&self, p: f64) -> bool {
        self.next_unit() < p
    }
}

/// Cancellable sleep.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Sleep for `duration` unless `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token was cancelled before the delay elapsed.
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Fixed(AtomicU64);

    impl Fixed {
        fn new(value: f64) -> Self {
            Self(AtomicU64::new(value.to_bits()))
        }
    }

    impl RandomSource for Fixed {
        fn next_unit(&self) -> f64 {
            f64::from_bits(self.0.load(Ordering::Relaxed))
        }

        fn fill_bytes(&self, dest: &mut [u8]) {
            dest.fill(0);
        }
    }

    #[test]
    fn range_endpoints() {
        assert_eq!(Fixed::new(0.0).next_in_range(-300, 200), -300);
        assert_eq!(Fixed::new(0.999_999).next_in_range(-300, 200), 200);
        assert_eq!(Fixed::new(0.5).next_in_range(0, 9), 5);
        assert_eq!(Fixed::new(0.7).next_in_range(4, 4), 4);
    }

    #[test]
    fn duration_within_bounds() {
        let d = Fixed::new(0.5).next_duration(Duration::from_millis(150), Duration::from_millis(300));
        assert!(d >= Duration::from_millis(150) && d <= Duration::from_millis(300));
    }

    #[test]
    fn chance_is_strict() {
        assert!(Fixed::new(0.04).chance(0.05));
        assert!(!Fixed::new(0.05).chance(0.05));
        assert!(!Fixed::new(0.0).chance(0.0));
    }
}
