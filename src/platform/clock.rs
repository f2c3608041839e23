//! Monotonic tick source.

use std::time::Instant;

use crate::registry::Tick;

/// Supplies monotonic ticks and millisecond conversion. A tick is an opaque
/// `u64`; only relative comparisons and additions are meaningful.
pub trait Clock: Send {
    fn now(&self) -> Tick;

    /// Convert a millisecond duration into this clock's tick units. The host
    /// backend's ticks already are milliseconds, so this is the identity —
    /// a backend with a different tick rate (e.g. an RTOS tick at 10ms)
    /// would override it.
    fn ms_to_ticks(&self, ms: u32) -> u64 {
        u64::from(ms)
    }

    /// Convenience: the tick `ms` milliseconds from now.
    fn deadline_after_ms(&self, ms: u32) -> Tick {
        self.now().saturating_add_ticks(self.ms_to_ticks(ms))
    }
}

/// Host backend: ticks are milliseconds elapsed since the clock was created.
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Tick {
        Tick(self.epoch.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonically_non_decreasing() {
        let clock = StdClock::new();
        let t1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let t2 = clock.now();
        assert!(t2 >= t1);
    }
}
