//! Time sources for measurement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic millisecond clock.
///
/// Implementations must never go backwards and must never fail.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds relative to an arbitrary origin.
    fn now_ms(&self) -> f64;
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hold one handle while
/// the sampler or runner holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock reading `ms`.
    pub fn starting_at(ms: f64) -> Self {
        let clock = Self::new();
        clock.set_ms(ms);
        clock
    }

    /// Move the clock forward. Negative or non-finite amounts are ignored.
    pub fn advance_ms(&self, ms: f64) {
        if !ms.is_finite() || ms <= 0.0 {
            return;
        }
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + ms).to_bits())
            });
    }

    /// Jump to `ms`, provided that does not move the clock backwards.
    pub fn set_ms(&self, ms: f64) {
        if !ms.is_finite() {
            return;
        }
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                (ms > f64::from_bits(bits)).then(|| ms.to_bits())
            });
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
