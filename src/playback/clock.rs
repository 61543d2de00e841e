use std::time::Instant;

/// Clock for the output audio timeline, in seconds
///
/// Abstracted so the scheduler can be driven by a fake clock in tests.
pub trait OutputClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall-free monotonic clock starting at zero when created
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
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

impl OutputClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
