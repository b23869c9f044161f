//! Client-side encoder reader used by the motor service (the feedback
//! controller and the session's GOTO/correction logic).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::EncoderError;
use crate::ipc::encoder_file::{EncoderSample, EncoderStatus};
use crate::ipc::IpcFile;

#[async_trait]
pub trait EncoderReader: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Reads the latest sample, rejecting it as stale if older than
    /// `max_age_ms`.
    async fn read_angle(&self, max_age_ms: f64) -> Result<EncoderSample, EncoderError>;

    /// Averages `num_samples` reads spaced `delay_ms` apart, after an
    /// initial `stabilization_ms` settle, returning the calibrated
    /// angle.
    async fn read_stable(
        &self,
        num_samples: u32,
        delay_ms: u64,
        stabilization_ms: u64,
    ) -> Result<f64, EncoderError>;
}

pub struct FileEncoderReader {
    file: IpcFile<EncoderSample>,
    default_max_age_ms: f64,
}

impl FileEncoderReader {
    pub fn new(file: IpcFile<EncoderSample>, default_max_age_ms: f64) -> Self {
        FileEncoderReader {
            file,
            default_max_age_ms,
        }
    }
}

#[async_trait]
impl EncoderReader for FileEncoderReader {
    async fn is_available(&self) -> bool {
        self.read_angle(self.default_max_age_ms).await.is_ok()
    }

    async fn read_angle(&self, max_age_ms: f64) -> Result<EncoderSample, EncoderError> {
        let sample = self
            .file
            .read()
            .await
            .map_err(|_| EncoderError::Absent {
                path: self.file.path().display().to_string(),
            })?;

        let age_ms = (now_secs() - sample.ts) * 1000.0;
        if age_ms > max_age_ms {
            return Err(EncoderError::StaleData {
                path: self.file.path().display().to_string(),
                age_ms,
                max_age_ms,
            });
        }

        if sample.status == EncoderStatus::Frozen {
            return Err(EncoderError::Frozen {
                stagnant_secs: sample.frozen_duration.unwrap_or(0.0),
            });
        }

        Ok(sample)
    }

    async fn read_stable(
        &self,
        num_samples: u32,
        delay_ms: u64,
        stabilization_ms: u64,
    ) -> Result<f64, EncoderError> {
        tokio::time::sleep(Duration::from_millis(stabilization_ms)).await;
        let mut readings = Vec::with_capacity(num_samples as usize);
        for i in 0..num_samples {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            readings.push(self.read_angle(self.default_max_age_ms).await?.angle);
        }
        Ok(circular_average(&readings))
    }
}

fn circular_average(values: &[f64]) -> f64 {
    let (sin_sum, cos_sum) = values.iter().fold((0.0, 0.0), |(s, c), &a| {
        let rad = a.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    crate::angle::normalize_360(sin_sum.atan2(cos_sum).to_degrees())
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

    #[tokio::test]
    async fn rejects_stale_samples() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::new(dir.path().join("ems22_position.json"));
        file.write_atomic(&EncoderSample {
            ts: now_secs() - 10.0,
            angle: 12.0,
            raw: 100,
            status: EncoderStatus::Ok,
            calibrated: true,
            frozen_duration: None,
        })
        .await
        .unwrap();

        let reader = FileEncoderReader::new(file, 500.0);
        let result = reader.read_angle(500.0).await;
        assert!(matches!(result, Err(EncoderError::StaleData { .. })));
    }

    #[tokio::test]
    async fn fresh_sample_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::new(dir.path().join("ems22_position.json"));
        file.write_atomic(&EncoderSample {
            ts: now_secs(),
            angle: 42.0,
            raw: 100,
            status: EncoderStatus::Ok,
            calibrated: true,
            frozen_duration: None,
        })
        .await
        .unwrap();

        let reader = FileEncoderReader::new(file, 500.0);
        let sample = reader.read_angle(500.0).await.unwrap();
        assert_float_eq::assert_float_absolute_eq!(sample.angle, 42.0);
    }

    #[tokio::test]
    async fn missing_file_is_absent_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::new(dir.path().join("missing.json"));
        let reader = FileEncoderReader::new(file, 500.0);
        assert!(!reader.is_available().await);
    }
}
