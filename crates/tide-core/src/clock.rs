//! Timestamp sources.
//!
//! The ledger never reads a clock itself; callers pass `now` into every
//! operation. [`SystemClock`] feeds the node, [`ManualClock`] drives tests.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::Clock;
use crate::types::Timestamp;

/// Wall-clock time in Unix seconds.
///
/// Never goes backwards: a system clock step backwards repeats the last
/// reported second instead. Across restarts, seed it with
/// [`SystemClock::with_floor`] from the latest persisted timestamp.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that never reports earlier than `floor`.
    pub fn with_floor(floor: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(floor),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp().max(0) as u64;
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// Manually advanced clock.
///
/// # Examples
///
/// ```
/// use tide_core::clock::ManualClock;
/// use tide_core::traits::Clock;
/// let clock = ManualClock::new(1_000);
/// clock.advance(3_600);
/// assert_eq!(clock.now(), 4_600);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let mut current = self.now.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(secs);
            match self
                .now
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Jump to an absolute time. Moving backwards is allowed so tests can
    /// exercise clock regression handling.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_recent_and_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        // 2020-01-01T00:00:00Z
        assert!(a > 1_577_836_800);
        assert!(b >= a);
    }

    #[test]
    fn system_clock_respects_floor() {
        // 2100-01-01T00:00:00Z
        let floor = 4_102_444_800;
        let clock = SystemClock::with_floor(floor);
        assert_eq!(clock.now(), floor);

        let past = SystemClock::with_floor(1_000);
        assert!(past.now() > 1_577_836_800);
    }

    #[test]
    fn manual_clock_advance_and_set() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.advance(5), 15);
        clock.set(3);
        assert_eq!(clock.now(), 3);
    }

    #[test]
    fn manual_clock_saturates() {
        let clock = ManualClock::new(u64::MAX - 1);
        assert_eq!(clock.advance(10), u64::MAX);
    }
}
