pub mod filter;
pub mod query;
pub mod reader;

use std::time::{Duration, Instant};

use crate::config::EncoderConfig;
use crate::error::EncoderError;
use crate::hardware::{ReferenceSwitch, SpiBus};
use crate::ipc::encoder_file::{EncoderSample, EncoderStatus};
use crate::ipc::IpcFile;
use filter::SampleFilter;

/// Samples the absolute SPI encoder at a fixed rate, accumulates
/// incremental counts across full-turn wraps, applies calibration, and
/// republishes a calibrated ring angle plus freshness timestamp.
pub struct EncoderDaemon<S: SpiBus, W: ReferenceSwitch> {
    spi: S,
    switch: W,
    config: EncoderConfig,
    file: IpcFile<EncoderSample>,

    total_counts: i64,
    prev_raw: Option<u16>,
    filter: SampleFilter,
    calibrated: bool,
    last_switch_trigger: Option<Instant>,

    consecutive_spi_errors: u32,
    last_motion_at: Instant,
    motor_active_hint: bool,
}

impl<S: SpiBus, W: ReferenceSwitch> EncoderDaemon<S, W> {
    pub fn new(spi: S, switch: W, config: EncoderConfig, file: IpcFile<EncoderSample>) -> Self {
        let median_window = config.median_window;
        let anti_spike = config.anti_spike_threshold_deg;
        EncoderDaemon {
            spi,
            switch,
            config,
            file,
            total_counts: 0,
            prev_raw: None,
            filter: SampleFilter::new(median_window, anti_spike),
            calibrated: false,
            last_switch_trigger: None,
            consecutive_spi_errors: 0,
            last_motion_at: Instant::now(),
            motor_active_hint: false,
        }
    }

    fn read_raw(&mut self) -> Result<u16, EncoderError> {
        let bytes = self.spi.read_raw_bytes()?;
        Ok((((bytes[0] & 0x3F) as u16) << 4) | ((bytes[1] >> 4) as u16))
    }

    /// One sample tick. Returns the sample to publish, or `None` if a
    /// SPI error occurred and the caller should retry next tick without
    /// publishing.
    pub fn tick(&mut self) -> Option<EncoderSample> {
        let raw = match self.read_raw() {
            Ok(raw) => {
                self.consecutive_spi_errors = 0;
                raw
            }
            Err(e) => {
                self.consecutive_spi_errors += 1;
                tracing::warn!(error = %e, consecutive = self.consecutive_spi_errors, "SPI read error");
                return Some(EncoderSample {
                    ts: now_secs(),
                    angle: 0.0,
                    raw: 0,
                    status: EncoderStatus::SpiError(e.to_string()),
                    calibrated: self.calibrated,
                    frozen_duration: None,
                });
            }
        };

        if let Some(prev_raw) = self.prev_raw {
            let mut diff = raw as i32 - prev_raw as i32;
            if diff > 512 {
                diff -= 1024;
            } else if diff < -512 {
                diff += 1024;
            }
            if diff != 0 {
                self.last_motion_at = Instant::now();
            }
            self.total_counts += diff as i64;
        }
        self.prev_raw = Some(raw);

        self.check_switch();

        let raw_angle = crate::angle::normalize_360(
            (self.total_counts as f64 / 1024.0) * 360.0 * self.config.calibration_factor
                * self.config.rotation_sign,
        );

        let filtered = self.filter.accept(raw_angle);
        let (status, frozen_duration) = self.stagnation_status();

        Some(EncoderSample {
            ts: now_secs(),
            angle: filtered.unwrap_or(raw_angle),
            raw,
            status,
            calibrated: self.calibrated,
            frozen_duration,
        })
    }

    fn check_switch(&mut self) {
        let active = match self.switch.is_active() {
            Ok(active) => active,
            Err(_) => return,
        };
        let debounced = self
            .last_switch_trigger
            .map(|t| t.elapsed() >= Duration::from_secs_f64(self.config.switch_debounce_secs))
            .unwrap_or(true);
        if active && debounced {
            self.last_switch_trigger = Some(Instant::now());
            // Re-derive total_counts so the next angle equals the
            // reference angle exactly.
            let target_counts = (self.config.switch_calibration_angle_deg
                / (360.0 * self.config.calibration_factor * self.config.rotation_sign)
                * 1024.0)
                .round() as i64;
            self.total_counts = target_counts;
            self.filter.reset();
            self.calibrated = true;
            tracing::info!(
                reference_angle = self.config.switch_calibration_angle_deg,
                "reference microswitch triggered, encoder calibrated"
            );
        }
    }

    fn stagnation_status(&mut self) -> (EncoderStatus, Option<f64>) {
        if self.motor_active_hint {
            let stagnant = self.last_motion_at.elapsed();
            if stagnant > Duration::from_millis(self.config.max_age_ms as u64 * 4) {
                return (EncoderStatus::Frozen, Some(stagnant.as_secs_f64()));
            }
        }
        (EncoderStatus::Ok, None)
    }

    pub fn set_motor_active_hint(&mut self, active: bool) {
        self.motor_active_hint = active;
        if active {
            self.last_motion_at = Instant::now();
        }
    }

    /// Publishes `sample` atomically.
    pub async fn publish(&self, sample: &EncoderSample) -> Result<(), crate::error::IpcError> {
        self.file.write_atomic(sample).await
    }

    pub fn consecutive_spi_errors(&self) -> u32 {
        self.consecutive_spi_errors
    }

    pub fn max_consecutive_spi_errors(&self) -> u32 {
        self.config.max_consecutive_spi_errors
    }

    /// Closes and reopens the SPI handle, called once
    /// `consecutive_spi_errors` reaches `max_consecutive_spi_errors`.
    /// Resets the counter regardless of outcome so a handle that still
    /// fails to reopen gets another full window of attempts rather than
    /// retrying every tick.
    pub fn reopen_spi(&mut self) -> Result<(), EncoderError> {
        let result = self.spi.reopen();
        self.consecutive_spi_errors = 0;
        result
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{MockReferenceSwitch, MockSpiBus};

    fn daemon_with(
        spi_bytes: Vec<[u8; 2]>,
        switch_active: bool,
    ) -> EncoderDaemon<MockSpiBus, MockReferenceSwitch> {
        let mut spi = MockSpiBus::new();
        let mut iter = spi_bytes.into_iter();
        spi.expect_read_raw_bytes()
            .returning(move || Ok(iter.next().unwrap()));
        let mut switch = MockReferenceSwitch::new();
        switch.expect_is_active().returning(move || Ok(switch_active));

        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::new(dir.path().join("ems22_position.json"));
        std::mem::forget(dir); // keep temp dir alive for the test's lifetime
        EncoderDaemon::new(spi, switch, EncoderConfig::default(), file)
    }

    #[test]
    fn angle_is_always_in_0_360() {
        let mut daemon = daemon_with(vec![[0x12, 0x30]; 4], false);
        for _ in 0..4 {
            let sample = daemon.tick().unwrap();
            assert!((0.0..360.0).contains(&sample.angle));
        }
    }

    #[test]
    fn switch_trigger_sets_reference_angle_and_calibrated() {
        let mut daemon = daemon_with(vec![[0x12, 0x30]; 2], true);
        let sample = daemon.tick().unwrap();
        assert!(sample.calibrated);
        assert_float_eq::assert_float_absolute_eq!(
            sample.angle,
            EncoderConfig::default().switch_calibration_angle_deg,
            1.0
        );
    }

    #[test]
    fn wrap_around_is_handled_via_shortest_delta() {
        // raw sequence near the wrap boundary: 1020 -> 5 should be a
        // +9 delta (1024-1020+5=9), not a huge negative jump.
        let mut daemon = daemon_with(
            vec![raw_to_bytes(1020), raw_to_bytes(5)],
            false,
        );
        daemon.tick();
        daemon.tick();
        assert_eq!(daemon.total_counts, 9);
    }

    #[test]
    fn frozen_status_carries_the_stagnation_duration() {
        let mut daemon = daemon_with(vec![[0x12, 0x30]; 2], false);
        daemon.set_motor_active_hint(true);
        daemon.last_motion_at = Instant::now() - Duration::from_secs(3);
        let sample = daemon.tick().unwrap();
        assert_eq!(sample.status, EncoderStatus::Frozen);
        let frozen_duration = sample.frozen_duration.expect("frozen sample should carry a duration");
        assert!(frozen_duration >= 3.0);
    }

    fn raw_to_bytes(raw: u16) -> [u8; 2] {
        let b0 = ((raw >> 4) & 0x3F) as u8;
        let b1 = ((raw & 0x0F) << 4) as u8;
        [b0, b1]
    }

    #[test]
    fn reopen_resets_consecutive_error_counter() {
        let mut spi = MockSpiBus::new();
        spi.expect_read_raw_bytes()
            .returning(|| Err(crate::error::EncoderError::Spi("bus fault".into())));
        spi.expect_reopen().times(1).returning(|| Ok(()));
        let mut switch = MockReferenceSwitch::new();
        switch.expect_is_active().returning(|| Ok(false));

        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::new(dir.path().join("ems22_position.json"));
        std::mem::forget(dir);
        let mut daemon = EncoderDaemon::new(spi, switch, EncoderConfig::default(), file);

        for _ in 0..daemon.max_consecutive_spi_errors() {
            daemon.tick();
        }
        assert_eq!(
            daemon.consecutive_spi_errors(),
            daemon.max_consecutive_spi_errors()
        );
        assert!(daemon.reopen_spi().is_ok());
        assert_eq!(daemon.consecutive_spi_errors(), 0);
    }
}
