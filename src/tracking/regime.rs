//! Adaptive regime manager: classifies the dome's required movement
//! into a tracking regime (normal, critical, continuous) based on
//! altitude, azimuth, and the size of the pending correction.

use serde::{Deserialize, Serialize};

use crate::angle::{self, Degrees};
use crate::config::AdaptiveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Normal,
    Critical,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegimeParameters {
    pub check_interval_seconds: f64,
    pub correction_threshold_degrees: Degrees,
    pub step_delay_seconds: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EvaluatedRegime {
    pub mode: Regime,
    pub parameters: RegimeParameters,
}

/// Classifies (altitude, azimuth, delta) into a regime and tracks the
/// previously evaluated regime so transitions can be logged with a
/// reason.
pub struct AdaptiveRegimeManager {
    config: AdaptiveConfig,
    current: Option<Regime>,
}

impl AdaptiveRegimeManager {
    pub fn new(config: AdaptiveConfig) -> Self {
        AdaptiveRegimeManager {
            config,
            current: None,
        }
    }

    pub fn parameters_for(&self, mode: Regime) -> RegimeParameters {
        match mode {
            Regime::Normal => self.config.normal,
            Regime::Critical => self.config.critical,
            Regime::Continuous => self.config.continuous,
        }
    }

    fn in_critical_zone(&self, azimuth: Degrees, altitude: Degrees) -> bool {
        let zone = &self.config.critical_zone;
        (zone.az_min_deg..=zone.az_max_deg).contains(&azimuth)
            && (zone.alt_min_deg..=zone.alt_max_deg).contains(&altitude)
    }

    /// Top-down decision rule; first match wins.
    pub fn evaluate(&mut self, altitude: Degrees, azimuth: Degrees, delta: Degrees) -> EvaluatedRegime {
        let abs_delta = delta.abs();
        let mut reasons: Vec<&'static str> = Vec::new();

        let mode = if abs_delta >= self.config.movement_extreme_deg {
            reasons.push("movement >= MOVEMENT_EXTREME");
            Regime::Continuous
        } else if altitude >= self.config.altitude_zenith_deg
            && abs_delta >= self.config.movement_min_for_continuous_deg
        {
            reasons.push("altitude >= ZENITH and movement >= MIN_FOR_CONTINUOUS");
            Regime::Continuous
        } else if self.in_critical_zone(azimuth, altitude) {
            reasons.push("inside critical zone rectangle");
            Regime::Critical
        } else if altitude >= self.config.altitude_critical_deg {
            reasons.push("altitude >= CRITICAL");
            Regime::Critical
        } else if abs_delta >= self.config.movement_critical_deg {
            reasons.push("movement >= MOVEMENT_CRITICAL");
            Regime::Critical
        } else {
            reasons.push("no elevated condition met");
            Regime::Normal
        };

        if self.current != Some(mode) {
            tracing::info!(?mode, ?reasons, previous = ?self.current, "regime transition");
            self.current = Some(mode);
        }

        EvaluatedRegime {
            mode,
            parameters: self.parameters_for(mode),
        }
    }

    pub fn current(&self) -> Option<Regime> {
        self.current
    }

    /// Signed angular distance, shorter path, with a human-readable
    /// description for diagnostics.
    pub fn shortest_path(&self, current: Degrees, target: Degrees) -> (Degrees, String) {
        let delta = angle::shortest_path(current, target);
        let description = if delta >= 0.0 {
            format!("clockwise {:.2} deg", delta)
        } else {
            format!("counter-clockwise {:.2} deg", delta.abs())
        };
        (delta, description)
    }

    pub fn diagnostic_info(&self) -> String {
        format!("current_regime={:?}", self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptiveConfig;

    fn manager() -> AdaptiveRegimeManager {
        AdaptiveRegimeManager::new(AdaptiveConfig::default())
    }

    #[test]
    fn regime_classification_picks_expected_mode_across_boundary_cases() {
        let cases = [
            (45.0, 120.0, 0.3, Regime::Normal),
            (69.0, 60.0, 2.0, Regime::Critical),
            (70.5, 58.0, 31.0, Regime::Critical),
            (71.0, 58.0, 70.0, Regime::Continuous),
            (76.0, 180.0, 5.0, Regime::Continuous),
            (76.0, 180.0, 0.5, Regime::Critical),
        ];
        for (alt, az, delta, expected) in cases {
            let mut mgr = manager();
            let evaluated = mgr.evaluate(alt, az, delta);
            assert_eq!(evaluated.mode, expected, "alt={alt} az={az} delta={delta}");
        }
    }

    #[test]
    fn decision_is_deterministic() {
        let mut mgr = manager();
        let first = mgr.evaluate(50.0, 10.0, 5.0).mode;
        let second = mgr.evaluate(50.0, 10.0, 5.0).mode;
        assert_eq!(first, second);
    }

    #[test]
    fn boundary_altitude_exactly_at_critical_and_zenith() {
        let mut mgr = manager();
        assert_eq!(mgr.evaluate(68.0, 0.0, 0.0).mode, Regime::Critical);
        let mut mgr2 = manager();
        assert_eq!(mgr2.evaluate(75.0, 0.0, 1.0).mode, Regime::Continuous);
    }

    #[test]
    fn boundary_movement_exactly_at_thresholds() {
        let mut mgr = manager();
        assert_eq!(mgr.evaluate(10.0, 0.0, 30.0).mode, Regime::Critical);
        let mut mgr2 = manager();
        assert_eq!(mgr2.evaluate(10.0, 0.0, 50.0).mode, Regime::Continuous);
    }
}
