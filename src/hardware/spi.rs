use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use super::SpiBus as SpiBusTrait;
use crate::error::EncoderError;

/// Real SPI-backed absolute encoder bus (EMS22A-style 10-bit device).
pub struct RppalSpiBus {
    spi: Spi,
    bus: u8,
    select: u8,
}

impl RppalSpiBus {
    pub fn open(bus: u8, select: u8) -> Result<Self, EncoderError> {
        let spi = Self::open_handle(bus, select)?;
        Ok(RppalSpiBus { spi, bus, select })
    }

    fn open_handle(bus: u8, select: u8) -> Result<Spi, EncoderError> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(EncoderError::Spi(format!("unsupported SPI bus {other}"))),
        };
        let select = match select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            other => {
                return Err(EncoderError::Spi(format!(
                    "unsupported SPI select {other}"
                )))
            }
        };
        Spi::new(bus, select, 1_000_000, Mode::Mode1).map_err(|e| EncoderError::Spi(e.to_string()))
    }
}

impl SpiBusTrait for RppalSpiBus {
    fn read_raw_bytes(&mut self) -> Result<[u8; 2], EncoderError> {
        let mut rx = [0u8; 2];
        self.spi
            .transfer(&mut rx, &[0u8; 2])
            .map_err(|e| EncoderError::Spi(e.to_string()))?;
        Ok(rx)
    }

    /// Drops the current handle and re-acquires the same bus/select pair.
    fn reopen(&mut self) -> Result<(), EncoderError> {
        self.spi = Self::open_handle(self.bus, self.select)?;
        Ok(())
    }
}
