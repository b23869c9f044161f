use rppal::gpio::{Gpio, InputPin, Level, OutputPin};

use super::{MotorGpio, ReferenceSwitch};
use crate::config::{GpioChip, MotorConfig};
use crate::error::{EncoderError, MotorError};

/// Real GPIO-backed motor driver. `rppal` addresses lines by BCM number
/// regardless of chip, so `gpio_chip` is accepted for
/// config-compatibility and logged, not dispatched on.
pub struct RppalMotorGpio {
    dir: OutputPin,
    step: OutputPin,
}

impl RppalMotorGpio {
    pub fn open(config: &MotorConfig) -> Result<Self, MotorError> {
        if matches!(config.gpio_chip, GpioChip::Chip0) {
            tracing::debug!("gpio_chip=chip0 requested; rppal addresses lines directly");
        }
        let gpio = Gpio::new().map_err(|e| MotorError::GpioClaim {
            pin: config.dir_pin,
            detail: e.to_string(),
        })?;
        let dir = gpio
            .get(config.dir_pin)
            .map_err(|e| MotorError::GpioClaim {
                pin: config.dir_pin,
                detail: e.to_string(),
            })?
            .into_output();
        let step = gpio
            .get(config.step_pin)
            .map_err(|e| MotorError::GpioClaim {
                pin: config.step_pin,
                detail: e.to_string(),
            })?
            .into_output();
        Ok(RppalMotorGpio { dir, step })
    }
}

impl MotorGpio for RppalMotorGpio {
    fn set_direction(&mut self, forward: bool) -> Result<(), MotorError> {
        self.dir.write(if forward { Level::High } else { Level::Low });
        Ok(())
    }

    fn pulse_step(&mut self, delay_secs: f64) -> Result<(), MotorError> {
        let half = std::time::Duration::from_secs_f64(delay_secs / 2.0);
        self.step.set_high();
        spin_sleep::sleep(half);
        self.step.set_low();
        spin_sleep::sleep(half);
        Ok(())
    }
}

/// In-memory twin of `RppalMotorGpio`. Tracks the simulated dome
/// position so the feedback controller and encoder reader can be
/// exercised end-to-end without hardware.
pub struct SimulatedMotorGpio {
    pub position_deg: std::sync::Arc<std::sync::Mutex<f64>>,
    steps_per_dome_revolution: f64,
    forward: bool,
}

impl SimulatedMotorGpio {
    pub fn new(
        position_deg: std::sync::Arc<std::sync::Mutex<f64>>,
        steps_per_dome_revolution: f64,
    ) -> Self {
        SimulatedMotorGpio {
            position_deg,
            steps_per_dome_revolution,
            forward: true,
        }
    }
}

impl MotorGpio for SimulatedMotorGpio {
    fn set_direction(&mut self, forward: bool) -> Result<(), MotorError> {
        self.forward = forward;
        Ok(())
    }

    fn pulse_step(&mut self, delay_secs: f64) -> Result<(), MotorError> {
        let half = std::time::Duration::from_secs_f64(delay_secs / 2.0);
        spin_sleep::sleep(half * 2);
        let step_deg = 360.0 / self.steps_per_dome_revolution;
        let mut pos = self.position_deg.lock().unwrap();
        *pos = crate::angle::normalize_360(
            *pos + if self.forward { step_deg } else { -step_deg },
        );
        Ok(())
    }
}

/// Real reference-microswitch reader (active-low).
pub struct RppalReferenceSwitch {
    pin: InputPin,
}

impl RppalReferenceSwitch {
    pub fn open(pin: u8) -> Result<Self, EncoderError> {
        let gpio = Gpio::new().map_err(|e| EncoderError::Spi(e.to_string()))?;
        let input = gpio
            .get(pin)
            .map_err(|e| EncoderError::Spi(e.to_string()))?
            .into_input_pullup();
        Ok(RppalReferenceSwitch { pin: input })
    }
}

impl ReferenceSwitch for RppalReferenceSwitch {
    fn is_active(&mut self) -> Result<bool, EncoderError> {
        Ok(self.pin.is_low())
    }
}
