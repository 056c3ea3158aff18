use crate::classifier::config::ClassifierConfig;
use crate::classifier::windowing::{VisibilityWindow, WindowPoint};
use crate::db::models::TrackPoint;
use crate::utils::geo::haversine_m;

/// Concatenate a device's mobile windows into one chronological point list.
///
/// Windows arrive time-ordered and disjoint from segmentation, so no re-sort
/// is needed.
pub fn concat_mobile_points(windows: &[VisibilityWindow]) -> Vec<WindowPoint> {
    windows.iter().flat_map(|w| w.points.iter().copied()).collect()
}

/// Greedy streaming decimation.
///
/// The first point is always kept. A later point is kept when it is at least
/// `mobile_decim_d_m` from the last kept point or at least
/// `mobile_decim_t_secs` after it. Points not strictly later than the last
/// kept point are dropped so timestamps stay unique.
pub fn decimate(points: &[WindowPoint], config: &ClassifierConfig) -> Vec<WindowPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut kept = vec![*first];
    let mut last = *first;
    for point in &points[1..] {
        let dt = point.timestamp - last.timestamp;
        if dt <= 0 {
            continue;
        }
        let d = haversine_m(last.point, point.point);
        if d >= config.mobile_decim_d_m || dt >= config.mobile_decim_t_secs {
            kept.push(*point);
            last = *point;
        }
    }
    kept
}

/// Build the decimated polyline of one device. Empty when fewer than two
/// points survive.
pub fn build_track(
    device_id: &str,
    windows: &[VisibilityWindow],
    config: &ClassifierConfig,
) -> Vec<TrackPoint> {
    let decimated = decimate(&concat_mobile_points(windows), config);
    if decimated.len() < 2 {
        return Vec::new();
    }

    decimated
        .into_iter()
        .map(|p| TrackPoint {
            device_id: device_id.to_string(),
            timestamp: p.timestamp,
            lat: p.point.lat,
            lon: p.point.lon,
        })
        .collect()
}
