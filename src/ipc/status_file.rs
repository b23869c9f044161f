use serde::{Deserialize, Serialize};

/// `motor_status.json`, owned by the motor service, published several
/// times per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorStatus {
    pub status: ServiceStatus,
    pub position: f64,
    pub target: Option<f64>,
    pub progress: u8,
    pub mode: ServiceMode,
    pub tracking_object: Option<String>,
    pub simulation: bool,
    pub error: Option<String>,
    pub last_update: chrono::DateTime<chrono::Utc>,
    pub tracking_logs: Vec<TrackingLogEntry>,
    pub tracking_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Idle,
    Moving,
    Tracking,
    Error,
    Initializing,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    Idle,
    Normal,
    Critical,
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLogEntry {
    pub time: chrono::DateTime<chrono::Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Bounded ring of the last N log entries published in `tracking_logs`.
pub struct BoundedLog {
    capacity: usize,
    entries: std::collections::VecDeque<TrackingLogEntry>,
}

impl BoundedLog {
    pub fn new(capacity: usize) -> Self {
        BoundedLog {
            capacity,
            entries: std::collections::VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, kind: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TrackingLogEntry {
            time: chrono::Utc::now(),
            message: message.into(),
            kind: kind.into(),
        });
    }

    pub fn entries(&self) -> Vec<TrackingLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_log_drops_oldest() {
        let mut log = BoundedLog::new(2);
        log.push("a", "info");
        log.push("b", "info");
        log.push("c", "info");
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "b");
        assert_eq!(entries[1].message, "c");
    }
}
