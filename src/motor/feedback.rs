//! Feedback controller: rotates the dome until its measured position is
//! within tolerance of a target angle, closing the loop against the
//! encoder.

use std::time::{Duration, Instant};

use crate::angle::{self, Degrees};
use crate::encoder::reader::EncoderReader;
use crate::error::EncoderError;
use crate::hardware::MotorGpio;
use crate::motor::driver::MotorDriver;

/// Default tuning constants.
pub const DEFAULT_PROTECTION_THRESHOLD_DEG: Degrees = 20.0;
pub const MAX_STAGNANT_CORRECTIONS: u32 = 3;
pub const MIN_MOVEMENT_THRESHOLD_DEG: Degrees = 0.1;
const STABILIZED_SAMPLES: u32 = 3;
const STABILIZED_SAMPLE_DELAY_MS: u64 = 10;
const STABILIZED_SETTLE_MS: u64 = 50;
const ITERATION_SLEEP_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackOutcome {
    /// Converged within tolerance.
    Success,
    /// Same reading for `MAX_STAGNANT_CORRECTIONS` consecutive iterations.
    Frozen,
    /// `max_duration` elapsed before convergence.
    TimedOut,
    /// `|error|` exceeded the protection threshold and large movement
    /// wasn't allowed.
    Anomalous,
}

#[derive(Debug, Clone)]
pub struct CorrectionRecord {
    pub iteration: u32,
    pub position_before: Degrees,
    pub correction_deg: Degrees,
}

#[derive(Debug, Clone)]
pub struct FeedbackResult {
    pub outcome: FeedbackOutcome,
    pub initial_position: Degrees,
    pub final_position: Degrees,
    pub final_error: Degrees,
    pub iterations: u32,
    pub corrections: Vec<CorrectionRecord>,
    pub elapsed: Duration,
    /// Set when the initial stabilized read failed and the controller
    /// fell back to an open-loop rotation.
    pub without_feedback: bool,
}

impl FeedbackResult {
    pub fn success(&self, tolerance_deg: Degrees) -> bool {
        self.outcome == FeedbackOutcome::Success && self.final_error.abs() < tolerance_deg
    }
}

pub struct FeedbackController<'a, G: MotorGpio, R: EncoderReader> {
    driver: &'a mut MotorDriver<G>,
    encoder: &'a R,
}

impl<'a, G: MotorGpio, R: EncoderReader> FeedbackController<'a, G, R> {
    pub fn new(driver: &'a mut MotorDriver<G>, encoder: &'a R) -> Self {
        FeedbackController { driver, encoder }
    }

    async fn stabilized_position(&self) -> Result<Degrees, EncoderError> {
        self.encoder
            .read_stable(STABILIZED_SAMPLES, STABILIZED_SAMPLE_DELAY_MS, STABILIZED_SETTLE_MS)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn rotate_with_feedback(
        &mut self,
        target_deg: Degrees,
        nominal_delay_secs: f64,
        tolerance_deg: Degrees,
        max_iterations: u32,
        max_correction_per_iteration_deg: Degrees,
        allow_large_movement: bool,
        max_duration: Duration,
    ) -> FeedbackResult {
        let started_at = Instant::now();

        let initial_position = match self.stabilized_position().await {
            Ok(pos) => pos,
            Err(_) => {
                // Fallback: open-loop rotate the shortest-path delta.
                let delta = angle::shortest_path(0.0, target_deg);
                let _ = self.driver.rotate(delta, nominal_delay_secs, true);
                return FeedbackResult {
                    outcome: FeedbackOutcome::Success,
                    initial_position: 0.0,
                    final_position: target_deg,
                    final_error: 0.0,
                    iterations: 0,
                    corrections: Vec::new(),
                    elapsed: started_at.elapsed(),
                    without_feedback: true,
                };
            }
        };

        let mut corrections = Vec::new();
        let mut current = initial_position;
        let mut previous_pre_correction: Option<Degrees> = None;
        let mut stagnant_count = 0u32;
        let mut outcome = FeedbackOutcome::TimedOut;
        let mut iterations = 0u32;

        for iteration in 1..=max_iterations {
            iterations = iteration;
            if started_at.elapsed() > max_duration {
                outcome = FeedbackOutcome::TimedOut;
                break;
            }

            current = match self.stabilized_position().await {
                Ok(pos) => pos,
                Err(EncoderError::Frozen { .. }) => {
                    outcome = FeedbackOutcome::Frozen;
                    break;
                }
                Err(_) => {
                    outcome = FeedbackOutcome::TimedOut;
                    break;
                }
            };

            let error = angle::shortest_path(current, target_deg);
            if error.abs() < tolerance_deg {
                outcome = FeedbackOutcome::Success;
                break;
            }

            if error.abs() > DEFAULT_PROTECTION_THRESHOLD_DEG && !allow_large_movement {
                outcome = FeedbackOutcome::Anomalous;
                break;
            }

            if let Some(previous) = previous_pre_correction {
                if angle::shortest_path(previous, current).abs() < MIN_MOVEMENT_THRESHOLD_DEG {
                    stagnant_count += 1;
                    if stagnant_count >= MAX_STAGNANT_CORRECTIONS {
                        outcome = FeedbackOutcome::Frozen;
                        break;
                    }
                } else {
                    stagnant_count = 0;
                }
            }
            previous_pre_correction = Some(current);

            let correction_magnitude = error.abs().min(max_correction_per_iteration_deg);
            let correction = correction_magnitude * error.signum();

            let _ = self.driver.rotate(correction, nominal_delay_secs, true);
            corrections.push(CorrectionRecord {
                iteration,
                position_before: current,
                correction_deg: correction,
            });

            tokio::time::sleep(Duration::from_millis(ITERATION_SLEEP_MS)).await;
        }

        let final_error = angle::shortest_path(current, target_deg);
        FeedbackResult {
            outcome,
            initial_position,
            final_position: current,
            final_error,
            iterations,
            corrections,
            elapsed: started_at.elapsed(),
            without_feedback: false,
        }
    }

    /// Relative variant: target = `(current_encoder + delta) mod 360`.
    pub async fn rotate_relative_with_feedback(
        &mut self,
        delta_deg: Degrees,
        nominal_delay_secs: f64,
        tolerance_deg: Degrees,
        max_iterations: u32,
        max_correction_per_iteration_deg: Degrees,
        allow_large_movement: bool,
        max_duration: Duration,
    ) -> FeedbackResult {
        let current = self.stabilized_position().await.unwrap_or(0.0);
        let target = angle::normalize_360(current + delta_deg);
        self.rotate_with_feedback(
            target,
            nominal_delay_secs,
            tolerance_deg,
            max_iterations,
            max_correction_per_iteration_deg,
            allow_large_movement,
            max_duration,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::hardware::MockMotorGpio;
    use crate::stop_token::StopToken;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FixedReader {
        angle: Arc<std::sync::Mutex<f64>>,
        reads: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl EncoderReader for FixedReader {
        async fn is_available(&self) -> bool {
            true
        }

        async fn read_angle(&self, _max_age_ms: f64) -> Result<crate::ipc::encoder_file::EncoderSample, EncoderError> {
            unimplemented!("not used by the feedback controller's stabilized-read path")
        }

        async fn read_stable(&self, _n: u32, _delay_ms: u64, _settle_ms: u64) -> Result<f64, EncoderError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(*self.angle.lock().unwrap())
        }
    }

    fn driver() -> MotorDriver<MockMotorGpio> {
        let mut gpio = MockMotorGpio::new();
        gpio.expect_set_direction().returning(|_| Ok(()));
        gpio.expect_pulse_step().returning(|_| Ok(()));
        MotorDriver::new(gpio, MotorConfig::default(), StopToken::new())
    }

    #[tokio::test]
    async fn converges_when_encoder_reaches_target() {
        let angle = Arc::new(std::sync::Mutex::new(45.0));
        let reads = Arc::new(AtomicU32::new(0));
        let reader = FixedReader {
            angle: angle.clone(),
            reads,
        };
        let mut driver = driver();
        let mut controller = FeedbackController::new(&mut driver, &reader);

        // Simulate the dome reaching the target after the first correction.
        *angle.lock().unwrap() = 50.0;

        let result = controller
            .rotate_with_feedback(
                50.0,
                0.001,
                0.5,
                10,
                180.0,
                false,
                Duration::from_secs(5),
            )
            .await;

        assert!(result.success(0.5));
        assert!(!result.without_feedback);
    }

    #[tokio::test]
    async fn frozen_encoder_is_detected_after_max_stagnant_corrections() {
        let angle = Arc::new(std::sync::Mutex::new(10.0));
        let reads = Arc::new(AtomicU32::new(0));
        let reader = FixedReader {
            angle: angle.clone(),
            reads,
        };
        let mut driver = driver();
        let mut controller = FeedbackController::new(&mut driver, &reader);

        let result = controller
            .rotate_with_feedback(
                50.0,
                0.001,
                0.5,
                10,
                180.0,
                true,
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(result.outcome, FeedbackOutcome::Frozen);
    }

    #[tokio::test]
    async fn protection_threshold_aborts_large_unallowed_movements() {
        let angle = Arc::new(std::sync::Mutex::new(0.0));
        let reads = Arc::new(AtomicU32::new(0));
        let reader = FixedReader {
            angle: angle.clone(),
            reads,
        };
        let mut driver = driver();
        let mut controller = FeedbackController::new(&mut driver, &reader);

        let result = controller
            .rotate_with_feedback(
                90.0,
                0.001,
                0.5,
                10,
                180.0,
                false,
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(result.outcome, FeedbackOutcome::Anomalous);
    }
}
