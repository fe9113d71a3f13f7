//! Simulation Adapters
//!
//! Implementations of the randomness and delay ports: thread-local RNG and
//! Tokio timers for production, fixed sequences and zero delay for tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Cancelled, Delay, RandomSource};

// =============================================================================
// Randomness
// =============================================================================

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandomSource;

impl RandomSource for ThreadRandomSource {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rng().fill(dest);
    }
}

/// Deterministic source that cycles through fixed unit values.
///
/// Bytes come from an internal counter, so every `fill_bytes` call yields
/// a distinct buffer.
#[derive(Debug)]
pub struct SequenceRandomSource {
    values: Vec<f64>,
    cursor: AtomicUsize,
    counter: AtomicU64,
}

impl SequenceRandomSource {
    /// Cycle through `values`; each is clamped into `[0, 1)`. An empty list
    /// behaves like `[0.0]`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() {
            vec![0.0]
        } else {
            values
                .into_iter()
                .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
                .collect()
        };
        Self {
            values,
            cursor: AtomicUsize::new(0),
            counter: AtomicU64::new(0),
        }
    }
}

impl RandomSource for SequenceRandomSource {
    fn next_unit(&self) -> f64 {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[index]
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        let seed = self.counter.fetch_add(1, Ordering::Relaxed).to_be_bytes();
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = seed[i % seed.len()] ^ u8::try_from(i % 256).unwrap_or_default();
        }
    }
}

// =============================================================================
// Delay
// =============================================================================

/// Real sleep on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Zero-length delay that still yields to the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_source_in_unit_range() {
        let source = ThreadRandomSource;
        for _ in 0..1000 {
            let v = source.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn sequence_cycles() {
        let source = SequenceRandomSource::new(vec![0.1, 0.2]);
        assert_eq!(source.next_unit(), 0.1);
        assert_eq!(source.next_unit(), 0.2);
        assert_eq!(source.next_unit(), 0.1);
    }

    #[test]
    fn sequence_clamps_values() {
        let source = SequenceRandomSource::new(vec![1.5]);
        assert!(source.next_unit() < 1.0);
        assert_eq!(SequenceRandomSource::new(vec![]).next_unit(), 0.0);
    }

    #[test]
    fn sequence_bytes_differ_between_calls() {
        let source = SequenceRandomSource::new(vec![0.5]);
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        source.fill_bytes(&mut a);
        source.fill_bytes(&mut b);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn tokio_delay_cancels() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = TokioDelay.sleep(Duration::from_secs(30), &cancel).await;
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_delay_elapses() {
        let cancel = CancellationToken::new();
        let result = TokioDelay.sleep(Duration::from_secs(5), &cancel).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn no_delay_respects_cancel() {
        let cancel = CancellationToken::new();
        assert_eq!(NoDelay.sleep(Duration::from_secs(30), &cancel).await, Ok(()));
        cancel.cancel();
        assert_eq!(NoDelay.sleep(Duration::ZERO, &cancel).await, Err(Cancelled));
    }
}
