use serde::{Deserialize, Serialize};

use crate::classifier::config::ClassifierConfig;
use crate::classifier::windowing::VisibilityWindow;
use crate::error::DeviceError;
use crate::log_debug;
use crate::utils::geo::{distinct_points, haversine_m, GeoPoint};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionLabel {
    Stationary,
    Mobile,
}

impl MotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionLabel::Stationary => "stationary",
            MotionLabel::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWindow {
    pub window: VisibilityWindow,
    pub label: MotionLabel,
}

/// Label a window Stationary when every pair of its points lies within
/// `r_stationary_m` (inclusive), Mobile otherwise.
///
/// The answer depends on the point set only. Any non-finite coordinate is
/// rejected up front so the early exit below cannot hide it.
pub fn classify_window(
    window: &VisibilityWindow,
    config: &ClassifierConfig,
) -> Result<MotionLabel, DeviceError> {
    let points = window.positions();
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(DeviceError::DegenerateGeometry {
            device_id: window.device_id.clone(),
            detail: format!("non-finite position ({}, {})", bad.lat, bad.lon),
        });
    }

    if exceeds_diameter(&points, config.r_stationary_m) {
        Ok(MotionLabel::Mobile)
    } else {
        Ok(MotionLabel::Stationary)
    }
}

/// True as soon as one pair is farther apart than `limit_m`.
fn exceeds_diameter(points: &[GeoPoint], limit_m: f64) -> bool {
    let points = distinct_points(points);
    points.iter().enumerate().any(|(i, a)| {
        points[i + 1..]
            .iter()
            .any(|b| haversine_m(*a, *b) > limit_m)
    })
}

pub fn label_windows(
    windows: Vec<VisibilityWindow>,
    config: &ClassifierConfig,
) -> Result<Vec<LabeledWindow>, DeviceError> {
    windows
        .into_iter()
        .map(|window| {
            let label = classify_window(&window, config)?;
            log_debug!(
                "{} window {}..{} ({} sightings): {}",
                window.device_id,
                window.start_time,
                window.end_time,
                window.sighting_count(),
                label.as_str()
            );
            Ok(LabeledWindow { window, label })
        })
        .collect()
}
