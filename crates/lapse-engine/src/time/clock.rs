use std::cell::Cell;
use std::time::Instant;

/// Monotonic millisecond clock.
///
/// Readings are measured from an arbitrary but fixed epoch and must never
/// decrease between calls.
pub trait MonotonicClock {
    fn now_ms(&self) -> f64;
}

/// Clock backed by `std::time::Instant`.
///
/// The epoch is the moment the clock was created.
#[derive(Debug, Copy, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to.
///
/// Used to drive the timer deterministically (tests, replays, hosts that
/// carry their own frame timestamps).
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    /// Moves the clock forward by `ms`. Negative amounts are ignored.
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    /// Jumps to `ms` if it lies ahead of the current reading.
    pub fn set(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10.0);
        clock.advance(5.0);
        clock.advance(0.5);
        assert_eq!(clock.now_ms(), 15.5);
    }

    #[test]
    fn manual_clock_ignores_negative_advance() {
        let clock = ManualClock::new(10.0);
        clock.advance(-1.0);
        clock.advance(f64::NAN);
        assert_eq!(clock.now_ms(), 10.0);
    }

    #[test]
    fn manual_clock_set_never_goes_back() {
        let clock = ManualClock::new(100.0);
        clock.set(40.0);
        assert_eq!(clock.now_ms(), 100.0);
        clock.set(250.0);
        assert_eq!(clock.now_ms(), 250.0);
    }
}
