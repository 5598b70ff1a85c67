//! Fixed-interval ticks for the control path.
//!
//! The bus and the liveness detector are polled on fixed intervals from the
//! consumer context instead of being driven by the media library's own event
//! loop. Time is always passed in, so ticks are deterministic under test.

use crate::config::TimingConfig;
use std::time::{Duration, Instant};

/// A repeating deadline.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Instant,
}

impl IntervalTimer {
    /// Starts a timer whose first tick is one interval after `now`.
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Returns true and re-arms if the timer is due at `now`.
    ///
    /// Missed ticks are coalesced into one.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    /// Configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// The two timers that live exactly as long as a pipeline.
#[derive(Debug)]
pub(crate) struct Timers {
    pub(crate) bus_poll: IntervalTimer,
    pub(crate) frame_timeout: IntervalTimer,
}

impl Timers {
    pub(crate) fn start(config: &TimingConfig, now: Instant) -> Self {
        Self {
            bus_poll: IntervalTimer::start(config.bus_poll_interval(), now),
            frame_timeout: IntervalTimer::start(config.timeout_check_interval(), now),
        }
    }
}
