use serde::{Deserialize, Serialize};

/// The single canonical physical location of a stationary transmitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticLocation {
    pub device_id: String,
    pub lat_mean: f64,
    pub lon_mean: f64,
    /// Half the largest pairwise distance among the contributing sightings.
    pub loc_error_m: f64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub n_obs: i64,
    /// Number of disjoint spatial clusters found before canonical selection.
    pub n_clusters: i64,
    /// Set when `loc_error_m` exceeds the stationary radius.
    pub loc_error_flag: bool,
}
