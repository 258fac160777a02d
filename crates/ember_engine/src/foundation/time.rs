//! Monotonic time sources
//!
//! Cache eviction ordering (`last_used`, `last_draw`) is driven by timestamps
//! from a `Clock` so that tests can control time explicitly instead of relying
//! on wall-clock scheduling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic tick value used for recency tracking.
///
/// The unit is clock-defined; only ordering matters to the caches.
pub type Timestamp = u64;

/// Monotonic time source
pub trait Clock {
    /// Current tick value. Must be monotonically non-decreasing.
    fn now(&self) -> Timestamp;
}

/// Wall-clock backed monotonic clock (microsecond ticks since creation)
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock anchored at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at tick zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `ticks`
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }

    /// Set the clock to an absolute tick value
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0);

        clock.advance(5);
        assert_eq!(clock.now(), 5);

        clock.set(100);
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
