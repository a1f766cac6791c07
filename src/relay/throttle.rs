//! Wrapping millisecond ticks and fixed-cadence throttles.

use std::time::Instant;

/// Milliseconds since the relay started, wrapping at `u32::MAX` (about 49.7 days).
pub type Tick = u32;

/// Ticks elapsed from `since` to `now`, correct across one counter wrap.
pub fn elapsed(now: Tick, since: Tick) -> u32 {
    now.wrapping_sub(since)
}

/// Gate that opens once `interval` ticks have passed since it was last marked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Throttle {
    interval: u32,
    last: Tick,
}

impl Throttle {
    pub fn new(interval: u32, start: Tick) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    pub fn is_due(&self, now: Tick) -> bool {
        elapsed(now, self.last) >= self.interval
    }

    pub fn mark(&mut self, now: Tick) {
        self.last = now;
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }
}

/// Source of [`Tick`]s backed by `Instant`.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Tick {
        // truncation is the wrap
        self.start.elapsed().as_millis() as Tick
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
