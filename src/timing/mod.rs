//! Fixed-rate sample clock
//!
//! Deadline-based tick scheduling for the audio sampler. Each tick has an
//! absolute deadline derived from one start instant, so a late tick never
//! shifts the ones after it.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock producing evenly spaced sample deadlines
///
/// Clones share the same timebase.
#[derive(Debug, Clone)]
pub struct SampleClock {
    start: Arc<Instant>,
    period_nanos: u64,
}

impl SampleClock {
    /// Create a clock ticking `rate` times per second, starting now
    pub fn new(rate: u32) -> Self {
        Self::from_instant(Instant::now(), rate)
    }

    /// Create a clock from an existing start instant
    pub fn from_instant(start: Instant, rate: u32) -> Self {
        Self {
            start: Arc::new(start),
            period_nanos: 1_000_000_000 / u64::from(rate.max(1)),
        }
    }

    /// Time between ticks
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.period_nanos)
    }

    /// Absolute deadline of tick `tick`
    #[inline]
    pub fn deadline(&self, tick: u64) -> Instant {
        *self.start + Duration::from_nanos(self.period_nanos.saturating_mul(tick))
    }

    /// Number of whole ticks elapsed since the start
    pub fn elapsed_ticks(&self) -> u64 {
        let elapsed = self.start.elapsed().as_nanos();
        (elapsed / u128::from(self.period_nanos)) as u64
    }

    /// Sleep until the deadline of `tick`, returning at once if it has passed
    pub fn wait_for(&self, tick: u64) {
        let deadline = self.deadline(tick);
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    pub fn start_instant(&self) -> Instant {
        *self.start
    }
}
