//! Motor driver: owns the DIR/STEP GPIO lines, emits precisely timed
//! pulses, and optionally applies an S-curve acceleration profile.

use crate::angle::{self, Degrees};
use crate::config::MotorConfig;
use crate::error::MotorError;
use crate::hardware::MotorGpio;
use crate::motor::ramp;
use crate::stop_token::StopToken;

/// Absolute floor below which a requested pulse delay is clamped, with a
/// warning.
const SAFETY_FLOOR_SECS: f64 = 10e-6;

/// How often `rotate` polls the cooperative stop flag.
const STOP_CHECK_INTERVAL_STEPS: u64 = 500;

pub struct MotorDriver<G: MotorGpio> {
    gpio: G,
    config: MotorConfig,
    stop_token: StopToken,
    initialized: bool,
}

impl<G: MotorGpio> MotorDriver<G> {
    pub fn new(gpio: G, config: MotorConfig, stop_token: StopToken) -> Self {
        MotorDriver {
            gpio,
            config,
            stop_token,
            initialized: true,
        }
    }

    fn clamp_delay(delay_secs: f64, pin: u8) -> f64 {
        if delay_secs < SAFETY_FLOOR_SECS {
            tracing::warn!(
                pin,
                requested_secs = delay_secs,
                floor_secs = SAFETY_FLOOR_SECS,
                "pulse delay below safety floor, clamping"
            );
            SAFETY_FLOOR_SECS
        } else {
            delay_secs
        }
    }

    pub fn set_direction(&mut self, forward: bool) -> Result<(), MotorError> {
        self.gpio.set_direction(forward)
    }

    /// Pulses STEP high for `delay/2`, low for `delay/2`, clamped to the
    /// safety floor.
    pub fn step(&mut self, delay_secs: f64) -> Result<(), MotorError> {
        if !self.initialized {
            return Err(MotorError::NotInitialized);
        }
        let clamped = Self::clamp_delay(delay_secs, self.config.step_pin);
        self.gpio.pulse_step(clamped)
    }

    /// Rotates by `delta_deg`, optionally ramped, checking the stop
    /// token every `STOP_CHECK_INTERVAL_STEPS` pulses. Returns the
    /// number of steps actually executed before any stop.
    pub fn rotate(
        &mut self,
        delta_deg: Degrees,
        nominal_delay_secs: f64,
        use_ramp: bool,
    ) -> Result<u64, MotorError> {
        let steps_per_rev = self.config.steps_per_dome_revolution();
        let steps = (delta_deg.abs() * steps_per_rev / 360.0).round() as u64;
        self.set_direction(delta_deg >= 0.0)?;

        let delays = if use_ramp && steps >= self.config.min_steps_for_ramp as u64 {
            ramp::build_ramp(
                steps,
                nominal_delay_secs,
                self.config.ramp_warmup_steps as u64,
                self.config.ramp_warmup_delay_secs,
                self.config.ramp_accel_steps as u64,
                self.config.min_steps_for_ramp as u64,
            )
        } else {
            vec![nominal_delay_secs; steps as usize]
        };

        for (i, &delay) in delays.iter().enumerate() {
            if i as u64 % STOP_CHECK_INTERVAL_STEPS == 0 && self.stop_token.is_stop_requested() {
                tracing::info!(executed = i, requested = steps, "rotation stopped early");
                return Ok(i as u64);
            }
            self.step(delay)?;
        }
        Ok(steps)
    }

    /// Computes the shortest-path delta from `current` to `target` then
    /// delegates to `rotate`.
    pub fn rotate_absolute(
        &mut self,
        target_deg: Degrees,
        current_deg: Degrees,
        nominal_delay_secs: f64,
        use_ramp: bool,
    ) -> Result<u64, MotorError> {
        let delta = angle::shortest_path(current_deg, target_deg);
        self.rotate(delta, nominal_delay_secs, use_ramp)
    }

    pub fn request_stop(&self) {
        self.stop_token.request_stop();
    }

    pub fn clear_stop_request(&self) {
        self.stop_token.clear();
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockMotorGpio;

    fn config() -> MotorConfig {
        MotorConfig {
            steps_per_motor_revolution: 200,
            microsteps: 1,
            gear_ratio: 1.0,
            correction_factor: 1.0,
            min_steps_for_ramp: 200,
            ..MotorConfig::default()
        }
        // steps_per_dome_revolution = 200
    }

    #[test]
    fn rotate_emits_expected_step_count() {
        let mut gpio = MockMotorGpio::new();
        gpio.expect_set_direction().returning(|_| Ok(()));
        gpio.expect_pulse_step().returning(|_| Ok(()));
        let mut driver = MotorDriver::new(gpio, config(), StopToken::new());
        let steps = driver.rotate(180.0, 0.0001, false).unwrap();
        assert_eq!(steps, 100); // half a revolution of 200 steps
    }

    #[test]
    fn stop_token_halts_rotation_early() {
        let mut gpio = MockMotorGpio::new();
        gpio.expect_set_direction().returning(|_| Ok(()));
        gpio.expect_pulse_step().returning(|_| Ok(()));
        let stop_token = StopToken::new();
        let mut driver = MotorDriver::new(gpio, config(), stop_token.clone());
        stop_token.request_stop();
        let steps = driver.rotate(360.0, 0.0001, false).unwrap();
        assert_eq!(steps, 0);
    }

    #[test]
    fn step_clamps_delay_below_safety_floor() {
        let mut gpio = MockMotorGpio::new();
        gpio.expect_pulse_step()
            .withf(|&delay| delay >= SAFETY_FLOOR_SECS)
            .returning(|_| Ok(()));
        let mut driver = MotorDriver::new(gpio, config(), StopToken::new());
        driver.step(1e-9).unwrap();
    }
}
