//! Time source for the polling loops.
//!
//! Every wait in the provisioning flow goes through [`Clock`], so tests and
//! the host simulator can run the flow on virtual time.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time plus a way to wait.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: Duration);

    /// Time elapsed since `start` (a value previously returned by [`Clock::now`]).
    fn elapsed_since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
///
/// Works on the host and on ESP-IDF, where `thread::sleep` yields to FreeRTOS.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
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
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock: `sleep` advances time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.sleep(Duration::from_millis(50));
        clock.advance(Duration::from_millis(25));
        assert_eq!(clock.now(), Duration::from_millis(75));
    }

    #[test]
    fn test_elapsed_since() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(3));
        assert_eq!(clock.elapsed_since(start), Duration::from_secs(3));
        // Origin in the future saturates to zero
        assert_eq!(
            clock.elapsed_since(Duration::from_secs(10)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
