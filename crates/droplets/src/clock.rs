//! Fixed-step accumulator for driving the simulator from real frame times.
//!
//! The simulator itself only knows its fixed `dt`. A frame loop feeds
//! measured frame durations into [`StepClock::advance`] and runs the returned
//! number of steps, which keeps replays deterministic regardless of frame rate.

use crate::constants::DEFAULT_MAX_STEPS_PER_FRAME;

#[derive(Clone, Debug)]
pub struct StepClock {
    dt: f32,
    accumulator: f32,
    max_steps_per_frame: usize,
    dropped_time: f32,
}

impl StepClock {
    /// `dt` must be positive; `max_steps_per_frame` is clamped to at least 1.
    pub fn new(dt: f32, max_steps_per_frame: usize) -> Self {
        debug_assert!(dt > 0.0, "dt must be positive, got {}", dt);
        Self {
            dt,
            accumulator: 0.0,
            max_steps_per_frame: max_steps_per_frame.max(1),
            dropped_time: 0.0,
        }
    }

    /// Clock with the default backlog cap.
    pub fn with_dt(dt: f32) -> Self {
        Self::new(dt, DEFAULT_MAX_STEPS_PER_FRAME)
    }

    /// Add elapsed real time and return how many fixed steps are due.
    pub fn advance(&mut self, frame_seconds: f32) -> usize {
        if frame_seconds.is_finite() && frame_seconds > 0.0 {
            self.accumulator += frame_seconds;
        }

        let due = (self.accumulator / self.dt).floor() as usize;
        let steps = due.min(self.max_steps_per_frame);
        self.accumulator -= steps as f32 * self.dt;

        if due > steps {
            // Past the cap: keep at most one step of backlog
            let excess = self.accumulator - self.dt;
            if excess > 0.0 {
                self.dropped_time += excess;
                self.accumulator = self.dt;
                log::debug!(
                    "StepClock: dropped {:.3}s of backlog ({} steps due, cap {})",
                    excess,
                    due,
                    self.max_steps_per_frame
                );
            }
        }
        steps
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt).clamp(0.0, 1.0)
    }

    /// Use a new step size. The accumulated time carries over.
    pub fn set_dt(&mut self, dt: f32) {
        debug_assert!(dt > 0.0, "dt must be positive, got {}", dt);
        self.dt = dt;
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Total real time discarded by the backlog cap.
    pub fn dropped_time(&self) -> f32 {
        self.dropped_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_partial_frames() {
        let mut clock = StepClock::new(0.01, 8);
        assert_eq!(clock.advance(0.004), 0);
        assert_eq!(clock.advance(0.004), 0);
        assert_eq!(clock.advance(0.004), 1);
        assert!((clock.alpha() - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_caps_backlog() {
        let mut clock = StepClock::new(0.01, 3);
        assert_eq!(clock.advance(1.0), 3);
        assert!(clock.dropped_time() > 0.9);
        // At most one step of backlog remains
        assert_eq!(clock.advance(0.0), 1);
        assert_eq!(clock.advance(0.0), 0);
    }

    #[test]
    fn test_ignores_bad_frame_times() {
        let mut clock = StepClock::with_dt(0.01);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.advance(0.025), 2);
    }
}
