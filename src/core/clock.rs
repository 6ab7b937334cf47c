//! Time source abstraction shared by the fetcher and the repository cache.
//!
//! Rate-limit spacing, backoff sleeps and cache TTL checks all read time through
//! [`Clock`], so tests can drive them with a [`VirtualClock`] instead of waiting.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Real time, backed by the system clock and `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A manually advanced clock. `sleep` advances the clock instantly and records
/// the requested duration.
#[derive(Debug)]
pub struct VirtualClock {
    inner: Mutex<VirtualClockState>,
}

#[derive(Debug)]
struct VirtualClockState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl VirtualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(VirtualClockState {
                now: start,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Start at a fixed epoch second, convenient for header arithmetic in tests
    pub fn at_epoch(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }

    /// Every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VirtualClockState> {
        // A poisoned lock only means a test panicked mid-update; the state is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }
}

/// Positive duration between two instants, zero if `later` is not after `earlier`
pub fn elapsed_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_sleep_advances_time() {
        let clock = VirtualClock::at_epoch(1_000);
        clock.sleep(Duration::from_secs(5));
        clock.sleep(Duration::from_millis(500));

        assert_eq!(clock.now().timestamp(), 1_005);
        assert_eq!(clock.total_slept(), Duration::from_millis(5_500));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn test_advance_does_not_record_sleep() {
        let clock = VirtualClock::at_epoch(0);
        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now().timestamp(), 60);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_elapsed_between_saturates() {
        let clock = VirtualClock::at_epoch(100);
        let earlier = clock.now();
        clock.advance(Duration::from_secs(3));
        assert_eq!(elapsed_between(earlier, clock.now()), Duration::from_secs(3));
        assert_eq!(elapsed_between(clock.now(), earlier), Duration::ZERO);
    }
}
