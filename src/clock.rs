//! Engine time source.
//!
//! All timestamps in the engine (enqueue, dequeue, wait times) are seconds
//! measured from a resettable epoch. The clock is a cloneable capability
//! injected into the engine so that tests can substitute a manually driven
//! source and make wait-time behavior deterministic.

use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug)]
enum Source {
    Monotonic(Instant),
    Manual(f64),
}

/// Shared, resettable time source returning seconds as `f64`.
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Arc<Mutex<Source>>,
}

impl Clock {
    /// A clock backed by the process monotonic timer, starting at zero.
    pub fn monotonic() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Source::Monotonic(Instant::now()))),
        }
    }

    /// A manually driven clock starting at zero; advance it with [`Clock::advance`].
    pub fn manual() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Source::Manual(0.0))),
        }
    }

    /// Seconds elapsed since the epoch. Non-decreasing between resets.
    pub fn now(&self) -> f64 {
        match *self.inner.lock().unwrap() {
            Source::Monotonic(epoch) => epoch.elapsed().as_secs_f64(),
            Source::Manual(now) => now,
        }
    }

    /// Move the epoch to the present, so subsequent `now()` calls restart
    /// from zero.
    pub fn reset(&self) {
        let mut source = self.inner.lock().unwrap();
        match &mut *source {
            Source::Monotonic(epoch) => *epoch = Instant::now(),
            Source::Manual(now) => *now = 0.0,
        }
    }

    /// Advance a manual clock by `seconds`. Meaningless for a monotonic
    /// clock, which advances on its own.
    pub fn advance(&self, seconds: f64) {
        let mut source = self.inner.lock().unwrap();
        match &mut *source {
            Source::Manual(now) => *now += seconds,
            Source::Monotonic(_) => {
                debug_assert!(false, "advance is only supported on manual clocks")
            }
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_resets() {
        let clock = Clock::manual();
        assert_eq!(clock.now(), 0.0);

        clock.advance(12.5);
        assert_eq!(clock.now(), 12.5);
        clock.advance(0.5);
        assert_eq!(clock.now(), 13.0);

        clock.reset();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn monotonic_clock_is_non_decreasing() {
        let clock = Clock::monotonic();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert!(first >= 0.0);
    }

    #[test]
    fn clones_share_the_same_epoch() {
        let clock = Clock::manual();
        let other = clock.clone();
        clock.advance(3.0);
        assert_eq!(other.now(), 3.0);
    }
}
