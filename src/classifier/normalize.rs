use std::cmp::Ordering;

use crate::db::models::Sighting;
use crate::log_info;
use crate::utils::geo::GeoPoint;

const ENABLE_LOGS: bool = true;

/// Signal strength assumed when a sighting carries none.
pub const MISSING_SIGNAL_DBM: f64 = -100.0;

/// A positioned sighting, unique on (device_id, timestamp, lat, lon).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSighting {
    pub device_id: String,
    pub timestamp: i64,
    pub point: GeoPoint,
    pub signal_dbm: f64,
}

/// Drop unpositioned sightings, collapse exact duplicates and order the rest
/// by (device_id, timestamp).
///
/// Of several rows sharing (device_id, timestamp, lat, lon) the strongest
/// signal is kept, so the result does not depend on input order.
pub fn normalize(sightings: Vec<Sighting>) -> Vec<NormalizedSighting> {
    let total = sightings.len();

    let mut normalized: Vec<NormalizedSighting> = sightings
        .into_iter()
        .filter_map(|s| match (s.lat, s.lon) {
            (Some(lat), Some(lon)) => Some(NormalizedSighting {
                device_id: s.device_id,
                timestamp: s.timestamp,
                point: GeoPoint::new(lat, lon),
                signal_dbm: s.signal_dbm.unwrap_or(MISSING_SIGNAL_DBM),
            }),
            _ => None,
        })
        .collect();
    let positioned = normalized.len();

    normalized.sort_by(|a, b| {
        a.device_id
            .cmp(&b.device_id)
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.point.lat.total_cmp(&b.point.lat))
            .then(a.point.lon.total_cmp(&b.point.lon))
            .then(b.signal_dbm.total_cmp(&a.signal_dbm))
    });
    normalized.dedup_by(|later, kept| same_tuple(later, kept) == Ordering::Equal);

    log_info!(
        "Normalized {} of {} sightings ({} without position, {} duplicates)",
        normalized.len(),
        total,
        total - positioned,
        positioned - normalized.len()
    );

    normalized
}

fn same_tuple(a: &NormalizedSighting, b: &NormalizedSighting) -> Ordering {
    a.device_id
        .cmp(&b.device_id)
        .then(a.timestamp.cmp(&b.timestamp))
        .then(a.point.lat.total_cmp(&b.point.lat))
        .then(a.point.lon.total_cmp(&b.point.lon))
}
