// SPDX-License-Identifier: CEPL-1.0
use std::time::{Duration, Instant};

/// Longest step handed to simulation code. Protects camera motion from
/// huge jumps after a stall (window drag, breakpoint, minimise).
pub const MAX_FRAME_DT: f32 = 0.1;

/// Per-frame delta time plus a rolling frames-per-second counter.
#[derive(Debug)]
pub struct FrameTimer {
    last: Instant,
    window_start: Instant,
    frames_in_window: u32,
    fps: f32,
    report_every: Duration,
}

impl FrameTimer {
    pub fn new(report_every: Duration) -> Self {
        Self::starting_at(Instant::now(), report_every)
    }

    pub fn starting_at(now: Instant, report_every: Duration) -> Self {
        Self {
            last: now,
            window_start: now,
            frames_in_window: 0,
            fps: 0.0,
            report_every,
        }
    }

    /// Advances the clock and returns the clamped dt in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// `tick` against an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frames_in_window += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= self.report_every {
            self.fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
            self.frames_in_window = 0;
            self.window_start = now;
        }
        dt.min(MAX_FRAME_DT)
    }

    /// Most recent fps sample (0 until the first window has elapsed).
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// True when `tick_at(now)` just closed a sampling window.
    pub fn sampled(&self) -> bool {
        self.frames_in_window == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped_after_stall() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::starting_at(t0, Duration::from_secs(1));
        let dt = timer.tick_at(t0 + Duration::from_secs(3));
        assert!((dt - MAX_FRAME_DT).abs() < f32::EPSILON);
    }

    #[test]
    fn short_frames_pass_through() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::starting_at(t0, Duration::from_secs(1));
        let dt = timer.tick_at(t0 + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-4);
    }

    #[test]
    fn fps_sampled_once_per_window() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::starting_at(t0, Duration::from_millis(500));
        for i in 1..=30 {
            timer.tick_at(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(timer.fps(), 0.0);
        assert!(!timer.sampled());

        for i in 31..=50 {
            timer.tick_at(t0 + Duration::from_millis(i * 10));
        }
        assert!(timer.sampled());
        assert!((timer.fps() - 100.0).abs() < 1.0);
    }
}
