use crate::classifier::config::ClassifierConfig;
use crate::db::models::{StaticLocation, TrackPoint};
use crate::log_debug;
use crate::utils::geo::{haversine_m, GeoPoint};

const ENABLE_LOGS: bool = true;

/// Mark a static location whose error radius exceeds the stationary radius.
/// The record is kept either way. Returns whether the flag is set.
pub fn flag_location_error(location: &mut StaticLocation, config: &ClassifierConfig) -> bool {
    location.loc_error_flag = location.loc_error_m > config.r_stationary_m;
    location.loc_error_flag
}

/// Implied speed (m/s) between two track points, with elapsed time floored at 1 s.
pub fn implied_speed_ms(from: &TrackPoint, to: &TrackPoint) -> f64 {
    let d = haversine_m(GeoPoint::new(from.lat, from.lon), GeoPoint::new(to.lat, to.lon));
    let dt = (to.timestamp - from.timestamp).max(1);
    d / dt as f64
}

/// True when `next` is far enough from, or late enough after, `prev` to
/// survive decimation.
fn clears_decimation(prev: &TrackPoint, next: &TrackPoint, config: &ClassifierConfig) -> bool {
    let d = haversine_m(GeoPoint::new(prev.lat, prev.lon), GeoPoint::new(next.lat, next.lon));
    d >= config.mobile_decim_d_m || next.timestamp - prev.timestamp >= config.mobile_decim_t_secs
}

/// Remove points that imply a speed above `max_speed_ms` from the previous
/// retained point.
///
/// After a removal the next candidate is measured against the same retained
/// point, so one outlier cannot drag the following legitimate points out with
/// it. A candidate that was only kept by decimation because it was far from the
/// removed outlier is dropped too, so consecutive retained points still clear
/// the decimation distance or interval. Returns the surviving points and the
/// number of speed removals.
pub fn enforce_speed_cap(track: Vec<TrackPoint>, config: &ClassifierConfig) -> (Vec<TrackPoint>, usize) {
    let mut retained: Vec<TrackPoint> = Vec::with_capacity(track.len());
    let mut removed = 0;

    for point in track {
        if let Some(prev) = retained.last() {
            let speed = implied_speed_ms(prev, &point);
            if speed > config.max_speed_ms {
                log_debug!(
                    "Dropping {} at {}: {:.1} m/s since {}",
                    point.device_id,
                    point.timestamp,
                    speed,
                    prev.timestamp
                );
                removed += 1;
                continue;
            }
            if !clears_decimation(prev, &point, config) {
                log_debug!(
                    "Dropping {} at {}: within decimation limits of {}",
                    point.device_id,
                    point.timestamp,
                    prev.timestamp
                );
                continue;
            }
        }
        retained.push(point);
    }

    (retained, removed)
}
