//! Millisecond time source
//!
//! The firmware has a free-running millisecond tick counter and nothing
//! else. Everything that waits (flash busy polling, chunk extraction) is a
//! busy loop against a `Deadline` computed from a `Clock`, so tests can drive
//! time deterministically with `StepClock`.

use core::cell::Cell;

/// Monotonic millisecond tick source
///
/// The counter is allowed to wrap; all comparisons go through `Deadline`.
pub trait Clock {
    /// Current tick count in milliseconds
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// A point in time on a wrapping millisecond counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(u32);

impl Deadline {
    /// Deadline `timeout_ms` from now
    pub fn after<C: Clock + ?Sized>(clock: &C, timeout_ms: u32) -> Self {
        Self(clock.now_ms().wrapping_add(timeout_ms))
    }

    /// The absolute tick value of this deadline
    pub const fn ticks(&self) -> u32 {
        self.0
    }

    /// True once `now` is at or past the deadline
    ///
    /// Uses signed distance so it stays correct across counter wraparound
    /// as long as deadlines are less than ~24 days away.
    pub fn expired_at(&self, now: u32) -> bool {
        now.wrapping_sub(self.0) as i32 >= 0
    }

    /// True once the clock has reached the deadline
    pub fn has_passed<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        self.expired_at(clock.now_ms())
    }
}

/// Deterministic clock for tests and simulations
///
/// Every call to `now_ms` returns the current value and then advances it by
/// `step` milliseconds, so a busy-wait loop is guaranteed to reach its
/// deadline after a bounded number of polls.
#[derive(Debug)]
pub struct StepClock {
    now: Cell<u32>,
    step: u32,
}

impl StepClock {
    /// Create a clock starting at `start` that advances `step` per read
    pub const fn new(start: u32, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    /// Create a clock that never advances on its own
    pub const fn frozen(start: u32) -> Self {
        Self::new(start, 0)
    }

    /// Move time forward without a read
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Current time without advancing
    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}

/// Host clock backed by `std::time::Instant`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose tick zero is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_expiry() {
        let clock = StepClock::frozen(1000);
        let deadline = Deadline::after(&clock, 50);
        assert_eq!(deadline.ticks(), 1050);
        assert!(!deadline.has_passed(&clock));
        clock.advance(49);
        assert!(!deadline.has_passed(&clock));
        clock.advance(1);
        assert!(deadline.has_passed(&clock));
    }

    #[test]
    fn test_deadline_across_wraparound() {
        let clock = StepClock::frozen(u32::MAX - 10);
        let deadline = Deadline::after(&clock, 20);
        assert_eq!(deadline.ticks(), 9);
        assert!(!deadline.has_passed(&clock));
        clock.advance(15);
        assert!(!deadline.has_passed(&clock));
        clock.advance(5);
        assert!(deadline.has_passed(&clock));
    }

    #[test]
    fn test_step_clock_advances_per_read() {
        let clock = StepClock::new(0, 3);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 3);
        assert_eq!(clock.peek(), 6);
    }
}
