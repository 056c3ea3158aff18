use serde::Serialize;

use crate::classifier::config::ClassifierConfig;
use crate::classifier::normalize::NormalizedSighting;
use crate::utils::geo::GeoPoint;

/// One sighting inside a visibility window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowPoint {
    pub timestamp: i64,
    pub point: GeoPoint,
    pub signal_dbm: f64,
}

impl From<&NormalizedSighting> for WindowPoint {
    fn from(s: &NormalizedSighting) -> Self {
        Self {
            timestamp: s.timestamp,
            point: s.point,
            signal_dbm: s.signal_dbm,
        }
    }
}

/// A maximal run of one device's sightings with no internal gap of
/// `t_max_gap_secs` or more.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityWindow {
    pub device_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub points: Vec<WindowPoint>,
}

impl VisibilityWindow {
    pub fn sighting_count(&self) -> usize {
        self.points.len()
    }

    pub fn positions(&self) -> Vec<GeoPoint> {
        self.points.iter().map(|p| p.point).collect()
    }
}

/// Split one device's sightings into chronologically ordered windows.
///
/// Windows shorter than `min_window_len` sightings are discarded.
pub fn segment_device(
    device_id: &str,
    sightings: &[NormalizedSighting],
    config: &ClassifierConfig,
) -> Vec<VisibilityWindow> {
    let mut points: Vec<WindowPoint> = sightings.iter().map(WindowPoint::from).collect();
    // Stable: equal timestamps keep their normalized (lat, lon) order.
    points.sort_by_key(|p| p.timestamp);

    let mut windows = Vec::new();
    let mut current: Option<VisibilityWindow> = None;

    for point in points {
        match &mut current {
            Some(window) if point.timestamp - window.end_time < config.t_max_gap_secs => {
                window.end_time = point.timestamp;
                window.points.push(point);
            }
            _ => {
                if let Some(window) = current.take() {
                    push_if_long_enough(&mut windows, window, config);
                }
                current = Some(VisibilityWindow {
                    device_id: device_id.to_string(),
                    start_time: point.timestamp,
                    end_time: point.timestamp,
                    points: vec![point],
                });
            }
        }
    }

    if let Some(window) = current {
        push_if_long_enough(&mut windows, window, config);
    }

    windows
}

fn push_if_long_enough(
    windows: &mut Vec<VisibilityWindow>,
    window: VisibilityWindow,
    config: &ClassifierConfig,
) {
    if window.sighting_count() >= config.min_window_len {
        windows.push(window);
    }
}
