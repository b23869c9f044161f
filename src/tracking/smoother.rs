//! Reusable circular moving-average utility with an explicit window
//! size and a reset-on-jump policy for real discontinuities.

use std::collections::VecDeque;

use crate::angle::{self, Degrees};

pub struct CircularSmoother {
    window: VecDeque<Degrees>,
    capacity: usize,
    reset_threshold_deg: Degrees,
}

impl CircularSmoother {
    pub fn new(capacity: usize, reset_threshold_deg: Degrees) -> Self {
        CircularSmoother {
            window: VecDeque::with_capacity(capacity),
            capacity,
            reset_threshold_deg,
        }
    }

    /// Feeds a new sample, resetting the window if it jumps more than
    /// `reset_threshold_deg` from the last smoothed value (a real
    /// discontinuity, not noise). Returns the smoothed circular average
    /// of the window after the push.
    pub fn push(&mut self, sample: Degrees) -> Degrees {
        if let Some(&last) = self.window.back() {
            if angle::shortest_path(last, sample).abs() > self.reset_threshold_deg {
                self.window.clear();
            }
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        self.average()
    }

    /// Circular mean via the unit-vector method, so averaging e.g.
    /// 350° and 10° yields 0°, not 180°.
    fn average(&self) -> Degrees {
        let (sin_sum, cos_sum) = self.window.iter().fold((0.0, 0.0), |(s, c), &a| {
            let rad = a.to_radians();
            (s + rad.sin(), c + rad.cos())
        });
        angle::normalize_360(sin_sum.atan2(cos_sum).to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_across_the_0_360_boundary() {
        let mut smoother = CircularSmoother::new(5, 10.0);
        smoother.push(359.0);
        let avg = smoother.push(1.0);
        assert_float_eq::assert_float_absolute_eq!(avg, 0.0, 1e-6);
    }

    #[test]
    fn resets_window_on_large_jump() {
        let mut smoother = CircularSmoother::new(5, 10.0);
        smoother.push(10.0);
        smoother.push(12.0);
        let avg = smoother.push(100.0);
        // window reset to just [100.0]
        assert_float_eq::assert_float_absolute_eq!(avg, 100.0, 1e-6);
    }

    #[test]
    fn window_is_bounded_by_capacity() {
        let mut smoother = CircularSmoother::new(3, 1000.0);
        for v in [0.0, 1.0, 2.0, 3.0, 4.0] {
            smoother.push(v);
        }
        assert_eq!(smoother.window.len(), 3);
    }
}
