pub mod gpio;
pub mod spi;

use crate::error::{EncoderError, MotorError};

/// Owns the DIR/STEP GPIO lines; single writer, implemented by a real
/// `rppal` driver and a simulated one behind one interface.
#[cfg_attr(test, mockall::automock)]
pub trait MotorGpio: Send {
    fn set_direction(&mut self, forward: bool) -> Result<(), MotorError>;

    /// Pulses STEP high then low, `delay_secs / 2` each. Callers are
    /// responsible for the 10µs safety floor; this only emits the pulse.
    fn pulse_step(&mut self, delay_secs: f64) -> Result<(), MotorError>;
}

/// The reference microswitch read by the encoder daemon.
#[cfg_attr(test, mockall::automock)]
pub trait ReferenceSwitch: Send {
    /// `true` when the switch is active (closed / pulled low).
    fn is_active(&mut self) -> Result<bool, EncoderError>;
}

/// The raw SPI transaction used to read the absolute encoder: two bytes
/// in, reconstructed into a 10-bit raw value by the caller.
#[cfg_attr(test, mockall::automock)]
pub trait SpiBus: Send {
    fn read_raw_bytes(&mut self) -> Result<[u8; 2], EncoderError>;

    /// Closes and reopens the underlying SPI handle after repeated read
    /// failures. Bus implementations with nothing to reopen (mocks, the
    /// null stand-in) can accept the default no-op.
    fn reopen(&mut self) -> Result<(), EncoderError> {
        Ok(())
    }
}
