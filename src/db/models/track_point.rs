use serde::{Deserialize, Serialize};

/// One retained point of a mobile device's decimated polyline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackPoint {
    pub device_id: String,
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
}
