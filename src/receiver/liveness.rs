//! Loss-of-signal detection.
//!
//! UDP has no teardown signal: when the sender stops, the pipeline stays
//! structurally alive and reports nothing. The only evidence is that frames
//! stop arriving, so liveness is tracked from frame timestamps alone.

use std::time::{Duration, Instant};

/// Result of a liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No frame since the pipeline started.
    NoFrames,
    /// Last frame is within the timeout.
    Fresh,
    /// Last frame is older than the timeout by the contained amount.
    Stale(Duration),
}

/// Tracks the last frame time and the recent frame rate.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_frame_at: Option<Instant>,
    window_start: Instant,
    frames_in_window: u32,
    fps: u32,
}

impl LivenessMonitor {
    /// Creates a monitor with no frames recorded.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_frame_at: None,
            window_start: now,
            frames_in_window: 0,
            fps: 0,
        }
    }

    /// Forgets all frames, as when a new pipeline starts.
    pub fn reset(&mut self, now: Instant) {
        self.last_frame_at = None;
        self.window_start = now;
        self.frames_in_window = 0;
        self.fps = 0;
    }

    /// Records a frame applied at `now`.
    pub fn record_frame(&mut self, now: Instant) {
        self.last_frame_at = Some(now);
        self.frames_in_window = self.frames_in_window.saturating_add(1);
    }

    /// Classifies the stream as of `now`.
    pub fn check(&self, now: Instant) -> Liveness {
        match self.last_frame_at {
            None => Liveness::NoFrames,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed > self.timeout {
                    Liveness::Stale(elapsed)
                } else {
                    Liveness::Fresh
                }
            }
        }
    }

    /// Closes the current counting window and returns frames per second.
    pub fn sample_fps(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed.is_zero() {
            return self.fps;
        }
        self.fps = (self.frames_in_window as f64 / elapsed.as_secs_f64()).round() as u32;
        self.frames_in_window = 0;
        self.window_start = now;
        self.fps
    }

    /// Rate from the last closed window.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Silence after which the stream is stale.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frames_until_recorded() {
        let t0 = Instant::now();
        let monitor = LivenessMonitor::new(Duration::from_secs(3), t0);
        assert_eq!(monitor.check(t0 + Duration::from_secs(10)), Liveness::NoFrames);
    }

    #[test]
    fn test_goes_stale_after_timeout() {
        let t0 = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(3), t0);
        monitor.record_frame(t0);

        assert_eq!(monitor.check(t0 + Duration::from_secs(3)), Liveness::Fresh);
        assert_eq!(
            monitor.check(t0 + Duration::from_millis(3500)),
            Liveness::Stale(Duration::from_millis(3500))
        );

        monitor.reset(t0);
        assert_eq!(monitor.check(t0 + Duration::from_secs(5)), Liveness::NoFrames);
    }

    #[test]
    fn test_fps_window() {
        let t0 = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(3), t0);
        for _ in 0..30 {
            monitor.record_frame(t0);
        }

        assert_eq!(monitor.sample_fps(t0 + Duration::from_secs(1)), 30);
        // Empty window
        assert_eq!(monitor.sample_fps(t0 + Duration::from_secs(2)), 0);
    }
}
