//! Anti-spike + median filtering for the encoder daemon, extracted out
//! of the daemon's tick loop so it's independently testable.

use std::collections::VecDeque;

use crate::angle::{self, Degrees};

pub struct SampleFilter {
    window: VecDeque<Degrees>,
    window_size: usize,
    last_accepted: Option<Degrees>,
    spike_threshold_deg: Degrees,
}

impl SampleFilter {
    pub fn new(window_size: usize, spike_threshold_deg: Degrees) -> Self {
        SampleFilter {
            window: VecDeque::with_capacity(window_size),
            window_size,
            last_accepted: None,
            spike_threshold_deg,
        }
    }

    /// Feeds a raw calibrated angle; discards it as a spike if it jumps
    /// more than `spike_threshold_deg` from the last accepted value,
    /// otherwise pushes it into the median window and returns the
    /// median once the window has at least 3 entries.
    pub fn accept(&mut self, angle_deg: Degrees) -> Option<Degrees> {
        let accepted = match self.last_accepted {
            Some(last) if angle::shortest_path(last, angle_deg).abs() > self.spike_threshold_deg => {
                last
            }
            _ => angle_deg,
        };
        self.last_accepted = Some(accepted);

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(accepted);

        if self.window.len() < 3 {
            return None;
        }
        Some(median(&self.window))
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_accepted = None;
    }
}

fn median(values: &VecDeque<Degrees>) -> Degrees {
    let mut sorted: Vec<Degrees> = values.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_spikes_beyond_threshold() {
        let mut filter = SampleFilter::new(5, 30.0);
        filter.accept(10.0);
        filter.accept(12.0);
        let median_before_spike = filter.accept(11.0);
        let after_spike = filter.accept(170.0); // > 30 deg jump, rejected
        assert!(median_before_spike.is_some());
        // Rejected sample is replaced by the last accepted value, so the
        // median should stay near the pre-spike cluster.
        assert!(after_spike.unwrap() < 30.0);
    }

    #[test]
    fn returns_none_until_three_samples() {
        let mut filter = SampleFilter::new(5, 30.0);
        assert!(filter.accept(1.0).is_none());
        assert!(filter.accept(2.0).is_none());
        assert!(filter.accept(3.0).is_some());
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = SampleFilter::new(5, 30.0);
        filter.accept(1.0);
        filter.accept(2.0);
        filter.accept(3.0);
        filter.reset();
        assert!(filter.accept(50.0).is_none());
    }
}
