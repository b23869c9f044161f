pub mod corrections;
pub mod goto;
pub mod state;

use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::config::{SiteConfig, TrackingConfig};
use crate::encoder::reader::EncoderReader;
use crate::hardware::MotorGpio;
use crate::motor::driver::MotorDriver;
use crate::stop_token::StopToken;
use crate::tracking::abaque::Abaque;
use crate::tracking::regime::AdaptiveRegimeManager;
use crate::tracking::smoother::CircularSmoother;

use state::SessionState;

/// Top-level orchestrator: owns the tracking session lifecycle, the
/// abaque, and (through `driver`/`encoder`) the ability to command
/// corrections. Session state lives in `session/state.rs`, the
/// periodic correction loop in `session/corrections.rs`, and the
/// start-of-session GOTO lifecycle in `session/goto.rs`, all as `impl`
/// blocks on this type.
pub struct Session<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    pub driver: MotorDriver<G>,
    pub encoder: R,
    pub astro: A,
    pub catalog: C,
    pub ephemerides: Eph,
    pub regime_manager: AdaptiveRegimeManager,
    pub abaque: Abaque,
    pub smoother: CircularSmoother,
    pub tracking_config: TrackingConfig,
    pub site: SiteConfig,
    pub stop_token: StopToken,
    pub state: Option<SessionState>,
}

impl<G, R, A, C, Eph> Session<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: MotorDriver<G>,
        encoder: R,
        astro: A,
        catalog: C,
        ephemerides: Eph,
        regime_manager: AdaptiveRegimeManager,
        abaque: Abaque,
        tracking_config: TrackingConfig,
        site: SiteConfig,
        stop_token: StopToken,
    ) -> Self {
        Session {
            driver,
            encoder,
            astro,
            catalog,
            ephemerides,
            regime_manager,
            abaque,
            smoother: CircularSmoother::new(5, 10.0),
            tracking_config,
            site,
            stop_token,
            state: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.as_ref().map(|s| s.active).unwrap_or(false)
    }

    pub fn current_object_name(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.object_name.clone())
    }

    /// Requests a stop on any ongoing rotation, marks the session
    /// inactive, and returns a summary for persistence as a
    /// `SessionRecord`.
    pub fn stop(&mut self) -> Option<crate::ipc::session_record::SessionRecord> {
        self.stop_token.request_stop();
        let state = self.state.take()?;
        let end_time = chrono::Utc::now();
        let duration = (end_time - state.start_time)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        let mut mode_distribution_secs = std::collections::HashMap::new();
        for entry in state.history() {
            *mode_distribution_secs.entry(entry.regime).or_insert(0.0) +=
                self.regime_manager_interval(entry.regime);
        }

        Some(crate::ipc::session_record::SessionRecord {
            session_id: uuid::Uuid::new_v4(),
            object_name: state.object_name.clone(),
            is_planet: state.is_planet,
            start_time: state.start_time,
            end_time,
            duration_secs: duration,
            total_corrections: state.total_corrections,
            total_movement_deg: state.total_movement_deg,
            mode_distribution_secs,
            final_regime: self.regime_manager.current().unwrap_or(crate::tracking::regime::Regime::Normal),
            encoder_was_available: true,
            corrections: state
                .history()
                .map(|e| crate::ipc::session_record::CorrectionLogEntry {
                    time: e.time,
                    delta_deg: e.delta_deg,
                    logical_position_deg: e.logical_position_deg,
                    regime: e.regime,
                })
                .collect(),
        })
    }

    /// Approximates the time spent in `regime` by attributing each
    /// correction's regime interval to it — exact wall-clock mode
    /// distribution would require timestamping every tick, which is
    /// more bookkeeping than the bilan needs.
    fn regime_manager_interval(&self, regime: crate::tracking::regime::Regime) -> f64 {
        self.regime_manager.parameters_for(regime).check_interval_seconds
    }
}
