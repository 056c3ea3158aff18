//! Great-circle helpers shared by the classifier stages.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Haversine distance between two points, in metres.
///
/// Returns NaN when either point carries a non-finite coordinate; callers
/// treat that as degenerate geometry.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.min(1.0).sqrt().asin()
}

/// The distinct positions in `points`, sorted by (lat, lon).
///
/// Receivers report the same fix many times, so pairwise scans over the
/// result cost a fraction of scans over the raw sightings.
pub fn distinct_points(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut distinct = points.to_vec();
    distinct.sort_by(|a, b| a.lat.total_cmp(&b.lat).then(a.lon.total_cmp(&b.lon)));
    distinct.dedup_by(|a, b| a.lat.total_cmp(&b.lat).is_eq() && a.lon.total_cmp(&b.lon).is_eq());
    distinct
}

/// Maximum pairwise haversine distance over `points`, in metres.
///
/// Zero for fewer than two points, NaN if any pair is undefined.
pub fn diameter_m(points: &[GeoPoint]) -> f64 {
    let points = distinct_points(points);
    let mut max = 0.0_f64;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let d = haversine_m(*a, *b);
            if d.is_nan() {
                return f64::NAN;
            }
            if d > max {
                max = d;
            }
        }
    }
    max
}

/// Linear received power (mW) for a signal strength in dBm.
pub fn signal_weight(rssi_dbm: f64) -> f64 {
    10f64.powf(rssi_dbm / 10.0)
}

/// Weighted mean position. `None` when the total weight is zero or not finite.
pub fn weighted_centroid<I>(weighted: I) -> Option<GeoPoint>
where
    I: IntoIterator<Item = (GeoPoint, f64)>,
{
    let mut total = 0.0;
    let mut lat = 0.0;
    let mut lon = 0.0;
    for (point, weight) in weighted {
        total += weight;
        lat += weight * point.lat;
        lon += weight * point.lon;
    }

    if total > 0.0 && total.is_finite() {
        let centroid = GeoPoint::new(lat / total, lon / total);
        centroid.is_finite().then_some(centroid)
    } else {
        None
    }
}
