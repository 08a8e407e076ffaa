//! Frame rate measurement.

use std::time::{Duration, Instant};

/// Counts presented frames and reports a rate once per reporting interval.
#[derive(Debug)]
pub struct FrameTimer {
    window_start: Instant,
    frames_in_window: u32,
    interval: Duration,
    total_frames: u64,
}

/// Frame statistics for one completed reporting interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Frames per second over the interval.
    pub fps: f64,
    /// Mean frame time in milliseconds.
    pub frame_time_ms: f64,
    /// Frames recorded since the timer was created.
    pub total_frames: u64,
}

impl FrameTimer {
    /// Creates a timer that reports every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
            interval,
            total_frames: 0,
        }
    }

    /// Records one frame at the current instant.
    ///
    /// Returns statistics when the reporting interval has elapsed, then
    /// starts a new interval.
    pub fn frame(&mut self) -> Option<FrameStats> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<FrameStats> {
        self.frames_in_window += 1;
        self.total_frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let frames = f64::from(self.frames_in_window);
        let stats = FrameStats {
            fps: frames / secs,
            frame_time_ms: secs * 1000.0 / frames,
            total_frames: self.total_frames,
        };

        self.window_start = now;
        self.frames_in_window = 0;
        Some(stats)
    }

    /// Frames recorded since the timer was created.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
