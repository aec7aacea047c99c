//! Monotonic clock abstraction.
//!
//! The failure detector and the prepared-ops watchdog both reason in
//! monotonic microseconds. Threading a `Clock` trait through them instead of
//! calling `Instant::now()` directly lets tests advance time deterministically
//! without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A source of monotonic microsecond readings.
pub trait Clock: Send + Sync {
    /// Returns a monotonically non-decreasing microsecond reading.
    /// Not wall-clock time; only meaningful relative to other calls on the
    /// same `Clock`.
    fn now_micros(&self) -> u64;
}

/// A `Clock` backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// A `Clock` whose reading is set explicitly, for deterministic tests of
/// timeout and watchdog behavior.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    micros: Arc<AtomicU64>,
}

impl FakeClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(micros: u64) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(micros)),
        }
    }

    /// Advances the clock by `micros` and returns the new reading.
    pub fn advance(&self, micros: u64) -> u64 {
        self.micros.fetch_add(micros, Ordering::SeqCst) + micros
    }

    /// Sets the clock to an absolute reading.
    pub fn set(&self, micros: u64) {
        self.micros.store(micros, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::SeqCst)
    }
}
