//! Per-session mutable state: the target's coordinates, the dome's
//! logical and encoder-relative position, and the rolling correction
//! history, all as plain fields on `Session`.

use chrono::{DateTime, Utc};

use crate::angle::Degrees;
use crate::tracking::regime::Regime;

#[derive(Debug, Clone)]
pub struct CorrectionHistoryEntry {
    pub time: DateTime<Utc>,
    pub delta_deg: Degrees,
    pub logical_position_deg: Degrees,
    pub regime: Regime,
}

pub struct SessionState {
    pub object_name: String,
    pub ra_deg: Degrees,
    pub dec_deg: Degrees,
    pub is_planet: bool,

    pub start_time: DateTime<Utc>,
    pub next_check_time: DateTime<Utc>,

    pub logical_position_deg: Degrees,
    pub encoder_offset_deg: Degrees,

    pub total_corrections: u32,
    pub total_movement_deg: Degrees,
    pub failed_feedback_count: u32,

    pub active: bool,

    /// Bounded rolling history of corrections, used to summarize the
    /// session when it ends.
    history: std::collections::VecDeque<CorrectionHistoryEntry>,
    history_capacity: usize,
}

impl SessionState {
    pub fn new(object_name: String, ra_deg: Degrees, dec_deg: Degrees, is_planet: bool) -> Self {
        let now = Utc::now();
        SessionState {
            object_name,
            ra_deg,
            dec_deg,
            is_planet,
            start_time: now,
            next_check_time: now,
            logical_position_deg: 0.0,
            encoder_offset_deg: 0.0,
            total_corrections: 0,
            total_movement_deg: 0.0,
            failed_feedback_count: 0,
            active: false,
            history: std::collections::VecDeque::with_capacity(200),
            history_capacity: 200,
        }
    }

    pub fn record_correction(&mut self, delta_deg: Degrees, regime: Regime) {
        self.total_corrections += 1;
        self.total_movement_deg += delta_deg.abs();
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(CorrectionHistoryEntry {
            time: Utc::now(),
            delta_deg,
            logical_position_deg: self.logical_position_deg,
            regime,
        });
    }

    pub fn history(&self) -> impl Iterator<Item = &CorrectionHistoryEntry> {
        self.history.iter()
    }
}
