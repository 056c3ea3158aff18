//! Sighting data model.
//!
//! A sighting is one packet observation of a transmitter, as stored by the
//! capture readers. Coordinates and signal strength may be missing.

use serde::{Deserialize, Serialize};

/// One capture file ingested into a mission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub mission: String,
    pub src_file: String,
    pub sha256: String,
    pub start_ts: i64,
    pub end_ts: i64,
}

/// A single timestamped radio sighting of a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sighting {
    pub id: Option<i64>,
    pub device_id: String,
    pub session_id: String,
    /// UTC seconds since the epoch.
    pub timestamp: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Received signal strength in dBm.
    pub signal_dbm: Option<f64>,
    pub channel: Option<i64>,
    pub frequency: Option<i64>,
}

/// Inclusive time filter applied when loading a mission's sightings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }
}
