//! S-curve acceleration profile: warm-up, acceleration, cruise,
//! deceleration phases, with smoothstep interpolation
//! `s(t) = 3t^2 - 2t^3` between the warm-up and nominal delays.

/// Produces the per-step delay (seconds) sequence for a rotation of
/// `steps` pulses at `nominal_delay_secs`, honoring `min_steps_for_ramp`.
/// Below that threshold, the ramp is disabled entirely.
pub fn build_ramp(
    steps: u64,
    nominal_delay_secs: f64,
    warmup_steps: u64,
    warmup_delay_secs: f64,
    nominal_accel_steps: u64,
    min_steps_for_ramp: u64,
) -> Vec<f64> {
    if steps < min_steps_for_ramp {
        return vec![nominal_delay_secs; steps as usize];
    }

    let w = warmup_steps.min(steps);
    // If there isn't room for two full acceleration phases plus warm-up,
    // scale A proportionally to (steps - W) / 4.
    let a = if steps >= 2 * nominal_accel_steps + w {
        nominal_accel_steps
    } else {
        ((steps.saturating_sub(w)) / 4).max(1)
    };

    let mut delays = Vec::with_capacity(steps as usize);
    delays.extend(std::iter::repeat(warmup_delay_secs).take(w as usize));

    for i in 0..a {
        let t = if a <= 1 { 1.0 } else { i as f64 / (a - 1) as f64 };
        let s = smoothstep(t);
        delays.push(lerp(warmup_delay_secs, nominal_delay_secs, s));
    }

    let cruise_steps = steps.saturating_sub(w + 2 * a);
    delays.extend(std::iter::repeat(nominal_delay_secs).take(cruise_steps as usize));

    for i in 0..a {
        let t = if a <= 1 { 1.0 } else { i as f64 / (a - 1) as f64 };
        let s = smoothstep(t);
        delays.push(lerp(nominal_delay_secs, warmup_delay_secs, s));
    }

    delays.truncate(steps as usize);
    while delays.len() < steps as usize {
        delays.push(nominal_delay_secs);
    }
    delays
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    3.0 * t * t - 2.0 * t * t * t
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_uses_nominal_delay_throughout() {
        let delays = build_ramp(50, 0.002, 10, 0.010, 500, 200);
        assert_eq!(delays.len(), 50);
        assert!(delays.iter().all(|&d| (d - 0.002).abs() < 1e-12));
    }

    #[test]
    fn ramp_shape_is_monotone_through_accel_and_decel_with_flat_warmup_and_cruise() {
        let delays = build_ramp(2000, 0.0001, 10, 0.010, 500, 200);
        assert_eq!(delays.len(), 2000);

        // First W delays equal the warm-up delay.
        for &d in &delays[..10] {
            assert_float_eq::assert_float_absolute_eq!(d, 0.010);
        }

        // Acceleration phase monotonically decreases.
        let accel = &delays[10..510];
        for window in accel.windows(2) {
            assert!(window[0] >= window[1] - 1e-15);
        }

        // Cruise is constant at the nominal delay.
        let cruise = &delays[510..delays.len() - 500];
        assert!(cruise.iter().all(|&d| (d - 0.0001).abs() < 1e-12));

        // Deceleration monotonically increases back toward warm-up delay.
        let decel = &delays[delays.len() - 500..];
        for window in decel.windows(2) {
            assert!(window[0] <= window[1] + 1e-15);
        }
    }

    #[test]
    fn small_step_counts_scale_accel_proportionally() {
        let delays = build_ramp(250, 0.0005, 10, 0.010, 500, 200);
        assert_eq!(delays.len(), 250);
        // Still starts at warm-up delay and ends near it (symmetric ramp).
        assert_float_eq::assert_float_absolute_eq!(delays[0], 0.010);
    }
}
