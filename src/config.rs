use serde::{Deserialize, Serialize};

use crate::angle::Degrees;
use crate::error::ConfigError;

const ALLOWED_MICROSTEPS: [u32; 6] = [1, 2, 4, 8, 16, 32];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GpioChip {
    Chip4,
    Chip0,
}

mod gpio_chip {
    use super::GpioChip;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(chip: &GpioChip, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match chip {
            GpioChip::Chip4 => "chip4",
            GpioChip::Chip0 => "chip0",
        })
    }

    struct ChipVisitor;
    impl<'de> Visitor<'de> for ChipVisitor {
        type Value = GpioChip;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("\"chip4\" or \"chip0\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<GpioChip, E> {
            match v {
                "chip4" => Ok(GpioChip::Chip4),
                "chip0" => Ok(GpioChip::Chip0),
                other => Err(de::Error::unknown_variant(other, &["chip4", "chip0"])),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<GpioChip, D::Error> {
        d.deserialize_str(ChipVisitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    pub latitude_deg: Degrees,
    pub longitude_deg: Degrees,
    pub tz_offset_hours: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            tz_offset_hours: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MotorConfig {
    pub steps_per_motor_revolution: u32,
    pub microsteps: u32,
    pub gear_ratio: f64,
    pub correction_factor: f64,
    pub dir_pin: u8,
    pub step_pin: u8,
    #[serde(with = "gpio_chip")]
    pub gpio_chip: GpioChip,
    pub min_steps_for_ramp: u32,
    pub ramp_warmup_steps: u32,
    pub ramp_accel_steps: u32,
    pub ramp_warmup_delay_secs: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        MotorConfig {
            steps_per_motor_revolution: 200,
            microsteps: 8,
            gear_ratio: 30.0,
            correction_factor: 1.0,
            dir_pin: 20,
            step_pin: 21,
            gpio_chip: GpioChip::Chip4,
            min_steps_for_ramp: 200,
            ramp_warmup_steps: 10,
            ramp_accel_steps: 500,
            ramp_warmup_delay_secs: 0.010,
        }
    }
}

impl MotorConfig {
    /// Computed once at load time instead of recomputed per call.
    pub fn steps_per_dome_revolution(&self) -> f64 {
        self.steps_per_motor_revolution as f64
            * self.microsteps as f64
            * self.gear_ratio
            * self.correction_factor
    }

    /// Validates the fields that are startup-fatal if wrong (invalid
    /// microstepping, non-positive quantities).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ALLOWED_MICROSTEPS.contains(&self.microsteps) {
            return Err(ConfigError::InvalidValue {
                key: "motor.microsteps".into(),
                detail: format!(
                    "{} is not one of {:?}",
                    self.microsteps, ALLOWED_MICROSTEPS
                ),
            });
        }
        for (key, value) in [
            ("motor.steps-per-motor-revolution", self.steps_per_motor_revolution as f64),
            ("motor.gear-ratio", self.gear_ratio),
            ("motor.correction-factor", self.correction_factor),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    detail: format!("must be positive, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EncoderConfig {
    pub enabled: bool,
    pub calibration_factor: f64,
    pub rotation_sign: f64,
    pub spi_bus: u8,
    pub spi_select: u8,
    pub switch_pin: u8,
    pub switch_calibration_angle_deg: Degrees,
    pub switch_debounce_secs: f64,
    pub poll_hz: f64,
    pub median_window: usize,
    pub anti_spike_threshold_deg: Degrees,
    pub max_age_ms: f64,
    pub tcp_port: u16,
    pub ipc_dir: String,
    pub max_consecutive_spi_errors: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            enabled: true,
            calibration_factor: 0.01077 / 0.9925,
            rotation_sign: -1.0,
            spi_bus: 0,
            spi_select: 0,
            switch_pin: 27,
            switch_calibration_angle_deg: 45.0,
            switch_debounce_secs: 2.0,
            poll_hz: 50.0,
            median_window: 5,
            anti_spike_threshold_deg: 30.0,
            max_age_ms: 500.0,
            tcp_port: 5556,
            ipc_dir: "/dev/shm".into(),
            max_consecutive_spi_errors: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrackingConfig {
    pub correction_threshold_deg: Degrees,
    pub feedback_min_deg: Degrees,
    pub large_movement_threshold_deg: Degrees,
    pub acceptable_error_threshold_deg: Degrees,
    pub max_failed_feedback: u32,
    pub abaque_path: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            correction_threshold_deg: 0.5,
            feedback_min_deg: 3.0,
            large_movement_threshold_deg: 30.0,
            acceptable_error_threshold_deg: 2.0,
            max_failed_feedback: 3,
            abaque_path: "data/abaque.json".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CriticalZone {
    pub az_min_deg: Degrees,
    pub az_max_deg: Degrees,
    pub alt_min_deg: Degrees,
    pub alt_max_deg: Degrees,
}

impl Default for CriticalZone {
    fn default() -> Self {
        // CRITICAL_ZONE_1 from adaptive_tracking.py
        CriticalZone {
            az_min_deg: 150.0,
            az_max_deg: 210.0,
            alt_min_deg: 60.0,
            alt_max_deg: 90.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdaptiveConfig {
    pub altitude_critical_deg: Degrees,
    pub altitude_zenith_deg: Degrees,
    pub movement_critical_deg: Degrees,
    pub movement_extreme_deg: Degrees,
    pub movement_min_for_continuous_deg: Degrees,
    pub critical_zone: CriticalZone,
    pub normal: crate::tracking::regime::RegimeParameters,
    pub critical: crate::tracking::regime::RegimeParameters,
    pub continuous: crate::tracking::regime::RegimeParameters,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        use crate::tracking::regime::RegimeParameters;
        AdaptiveConfig {
            altitude_critical_deg: 68.0,
            altitude_zenith_deg: 75.0,
            movement_critical_deg: 30.0,
            movement_extreme_deg: 50.0,
            movement_min_for_continuous_deg: 1.0,
            critical_zone: CriticalZone::default(),
            normal: RegimeParameters {
                check_interval_seconds: 60.0,
                correction_threshold_degrees: 0.5,
                step_delay_seconds: 0.002,
            },
            critical: RegimeParameters {
                check_interval_seconds: 15.0,
                correction_threshold_degrees: 0.25,
                step_delay_seconds: 0.001,
            },
            continuous: RegimeParameters {
                check_interval_seconds: 5.0,
                correction_threshold_degrees: 0.1,
                step_delay_seconds: 0.00015,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub site: SiteConfig,
    pub motor: MotorConfig,
    pub encoder: EncoderConfig,
    pub tracking: TrackingConfig,
    pub adaptive: AdaptiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site: SiteConfig::default(),
            motor: MotorConfig::default(),
            encoder: EncoderConfig::default(),
            tracking: TrackingConfig::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl Config {
    pub fn load(app_name: &str) -> Result<Self, ConfigError> {
        let config: Config =
            confy::load(app_name, None).map_err(|e| ConfigError::LoadFailed {
                path: app_name.into(),
                detail: e.to_string(),
            })?;
        config.motor.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_motor_config_is_valid() {
        assert!(MotorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_disallowed_microstepping() {
        let mut motor = MotorConfig::default();
        motor.microsteps = 7;
        assert!(matches!(
            motor.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_negative_gear_ratio() {
        let mut motor = MotorConfig::default();
        motor.gear_ratio = -1.0;
        assert!(motor.validate().is_err());
    }

    #[test]
    fn steps_per_dome_revolution_is_derived() {
        let motor = MotorConfig {
            steps_per_motor_revolution: 200,
            microsteps: 8,
            gear_ratio: 30.0,
            correction_factor: 1.0,
            ..MotorConfig::default()
        };
        assert_float_eq::assert_float_relative_eq!(
            motor.steps_per_dome_revolution(),
            48000.0
        );
    }
}
