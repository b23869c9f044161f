//! Periodic correction loop: re-evaluates the target dome azimuth on
//! each tick and issues a correction once the drift exceeds the
//! current regime's threshold.

use std::time::Duration;

use super::Session;
use crate::angle;
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;
use crate::motor::feedback::{FeedbackController, FeedbackOutcome};

impl<G, R, A, C, Eph> Session<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    /// Invoked each IPC tick; gated by `next_check_time`.
    pub async fn check_and_correct(&mut self, now: chrono::DateTime<chrono::Utc>) -> Result<(), DomeError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        if now < state.next_check_time {
            return Ok(());
        }

        let (ra_deg, dec_deg, is_planet, object_name) = {
            let state = self.state.as_ref().unwrap();
            (state.ra_deg, state.dec_deg, state.is_planet, state.object_name.clone())
        };

        let (ra_deg, dec_deg) = if is_planet {
            self.ephemerides
                .planet_position(&object_name, now, self.site.latitude_deg, self.site.longitude_deg)
                .unwrap_or((ra_deg, dec_deg))
        } else {
            (ra_deg, dec_deg)
        };

        let horizontal = self.astro.equatorial_to_horizontal(
            ra_deg,
            dec_deg,
            now,
            self.site.latitude_deg,
            self.site.longitude_deg,
        );

        let lookup = self.abaque.lookup(horizontal.altitude_deg, horizontal.azimuth_deg);
        let smoothed_target = self.smoother.push(lookup.dome_azimuth_deg);

        let logical_position = self.state.as_ref().unwrap().logical_position_deg;
        let (delta, _) = self.regime_manager.shortest_path(logical_position, smoothed_target);

        let evaluated = self
            .regime_manager
            .evaluate(horizontal.altitude_deg, horizontal.azimuth_deg, delta.abs());

        if delta.abs() < evaluated.parameters.correction_threshold_degrees {
            let state = self.state.as_mut().unwrap();
            state.next_check_time = now + chrono::Duration::seconds(evaluated.parameters.check_interval_seconds as i64);
            return Ok(());
        }

        let encoder_available = self.encoder.is_available().await;
        let allow_large = delta.abs() > self.tracking_config.large_movement_threshold_deg;

        let outcome = if encoder_available {
            let encoder_offset = self.state.as_ref().unwrap().encoder_offset_deg;
            let target_encoder = angle::normalize_360(logical_position + delta - encoder_offset);
            let mut controller = FeedbackController::new(&mut self.driver, &self.encoder);
            let result = controller
                .rotate_with_feedback(
                    target_encoder,
                    evaluated.parameters.step_delay_seconds,
                    evaluated.parameters.correction_threshold_degrees,
                    10,
                    180.0,
                    allow_large,
                    Duration::from_secs(60),
                )
                .await;
            Some((result.outcome, result.final_error))
        } else {
            let _ = self.driver.rotate(delta, evaluated.parameters.step_delay_seconds, true);
            None
        };

        {
            let state = self.state.as_mut().unwrap();
            state.logical_position_deg = angle::normalize_360(state.logical_position_deg + delta);
            state.record_correction(delta, evaluated.mode);
        }

        if let Some((outcome, final_error)) = outcome {
            self.apply_feedback_outcome(outcome, final_error);
        }

        let session_should_stop = self
            .state
            .as_ref()
            .map(|s| s.failed_feedback_count >= self.tracking_config.max_failed_feedback)
            .unwrap_or(false);
        if session_should_stop {
            tracing::error!("session stopped: too many consecutive feedback failures");
            self.stop();
            return Ok(());
        }

        let state = self.state.as_mut().unwrap();
        state.next_check_time = now + chrono::Duration::seconds(evaluated.parameters.check_interval_seconds as i64);
        Ok(())
    }

    /// Success resets the failure counter. A timeout whose final error
    /// is already within the acceptable-error threshold is a warning,
    /// not a failure; any other timeout or a frozen/anomalous outcome
    /// increments the failure counter.
    fn apply_feedback_outcome(&mut self, outcome: FeedbackOutcome, final_error: crate::angle::Degrees) {
        let Some(state) = self.state.as_mut() else { return };
        match outcome {
            FeedbackOutcome::Success => {
                state.failed_feedback_count = 0;
            }
            FeedbackOutcome::TimedOut => {
                if final_error.abs() < self.tracking_config.acceptable_error_threshold_deg {
                    tracing::warn!(final_error, "feedback correction timed out near target, not counted as a failure");
                } else {
                    tracing::warn!(final_error, "feedback correction timed out");
                    state.failed_feedback_count += 1;
                }
            }
            FeedbackOutcome::Frozen | FeedbackOutcome::Anomalous => {
                state.failed_feedback_count += 1;
            }
        }
    }
}
