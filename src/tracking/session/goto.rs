//! Session-start GOTO lifecycle: looks up the target, converts to
//! horizontal coordinates, consults the abaque, and slews the dome
//! into position before tracking begins.

use std::time::Duration;

use super::state::SessionState;
use super::Session;
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;
use crate::motor::feedback::FeedbackController;

impl<G, R, A, C, Eph> Session<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    /// Starts a tracking session for `object_name`: looks it up, slews
    /// the dome to the initial dome-azimuth target unless `skip_goto`,
    /// and begins the periodic correction loop.
    pub async fn start_tracking(
        &mut self,
        object_name: &str,
        skip_goto: bool,
    ) -> Result<(), DomeError> {
        let mut position = self
            .catalog
            .lookup(object_name)
            .ok_or_else(|| DomeError::Abaque(crate::error::AbaqueError::Malformed {
                path: object_name.to_string(),
                detail: "object not found in catalog".into(),
            }))?;

        let now = chrono::Utc::now();
        if position.is_planet {
            if let Some((ra, dec)) = self.ephemerides.planet_position(
                object_name,
                now,
                self.site.latitude_deg,
                self.site.longitude_deg,
            ) {
                position.ra_deg = ra;
                position.dec_deg = dec;
            }
        }

        let horizontal = self.astro.equatorial_to_horizontal(
            position.ra_deg,
            position.dec_deg,
            now,
            self.site.latitude_deg,
            self.site.longitude_deg,
        );

        let lookup = self
            .abaque
            .lookup(horizontal.altitude_deg, horizontal.azimuth_deg);
        let target = lookup.dome_azimuth_deg;

        let mut state = SessionState::new(
            object_name.to_string(),
            position.ra_deg,
            position.dec_deg,
            position.is_planet,
        );

        if !skip_goto && self.encoder.is_available().await {
            let initial_angle = self
                .encoder
                .read_angle(self.tracking_config.correction_threshold_deg.max(500.0))
                .await
                .ok();

            if let Some(sample) = initial_angle.filter(|s| s.calibrated) {
                let (initial_delta, _) = self
                    .regime_manager
                    .shortest_path(sample.angle, target);

                if initial_delta.abs() > self.tracking_config.correction_threshold_deg {
                    self.regime_manager
                        .evaluate(horizontal.altitude_deg, horizontal.azimuth_deg, initial_delta.abs());

                    let mut controller = FeedbackController::new(&mut self.driver, &self.encoder);
                    let _ = controller
                        .rotate_with_feedback(
                            target,
                            0.002,
                            0.5,
                            10,
                            180.0,
                            true,
                            Duration::from_secs(60),
                        )
                        .await;
                }

                let after = self
                    .encoder
                    .read_angle(500.0)
                    .await
                    .map(|s| s.angle)
                    .unwrap_or(target);
                state.encoder_offset_deg = target - after;
                state.logical_position_deg = after;
            } else {
                // Not calibrated: assume mechanically pre-centred.
                state.logical_position_deg = target;
            }
        } else {
            state.logical_position_deg = target;
        }

        let regime = self.regime_manager.evaluate(horizontal.altitude_deg, horizontal.azimuth_deg, 0.0);
        state.active = true;
        state.next_check_time = now + chrono::Duration::seconds(regime.parameters.check_interval_seconds as i64);
        self.stop_token.clear();
        self.state = Some(state);
        Ok(())
    }
}
