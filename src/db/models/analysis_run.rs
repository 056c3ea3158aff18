//! Run summary persisted alongside every committed analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    pub run_id: String,
    pub mission: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sightings_loaded: u64,
    pub sightings_normalized: u64,
    pub devices_processed: u64,
    pub devices_skipped: u64,
    pub static_locations: u64,
    pub mobile_tracks: u64,
    pub track_points: u64,
    /// Static locations whose error radius exceeds the stationary radius.
    pub location_flags: u64,
    /// Track points removed by the speed cap.
    pub speed_removals: u64,
}

impl AnalysisSummary {
    /// Total data-quality annotations raised by the run.
    pub fn quality_flags(&self) -> u64 {
        self.location_flags + self.speed_removals
    }
}
