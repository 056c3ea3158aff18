//! Per-device fan-out of the classifier stages.
//!
//! Devices share no state, so each one runs Windowed -> Labeled ->
//! {Aggregated, Tracked} -> QA-checked on the rayon pool. A failing device is
//! logged and skipped; the others still reach the output.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use crate::classifier::aggregate::aggregate_device;
use crate::classifier::clustering::SpatialClusterer;
use crate::classifier::config::ClassifierConfig;
use crate::classifier::motion::{label_windows, MotionLabel};
use crate::classifier::normalize::{normalize, NormalizedSighting};
use crate::classifier::quality::{enforce_speed_cap, flag_location_error};
use crate::classifier::track::build_track;
use crate::classifier::windowing::{segment_device, VisibilityWindow};
use crate::db::models::{Sighting, StaticLocation, TrackPoint};
use crate::error::DeviceError;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// What one device contributed to the run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceOutcome {
    pub device_id: String,
    pub static_location: Option<StaticLocation>,
    /// Empty when the device has no surviving mobile track.
    pub track: Vec<TrackPoint>,
    pub stationary_windows: usize,
    pub mobile_windows: usize,
    pub speed_removals: usize,
}

/// Everything the run commits, plus the counters for its summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Sorted by device id.
    pub static_locations: Vec<StaticLocation>,
    /// Sorted by (device id, timestamp).
    pub track_points: Vec<TrackPoint>,
    pub sightings_normalized: usize,
    pub devices_processed: usize,
    pub skipped: Vec<DeviceError>,
    pub mobile_tracks: usize,
    pub location_flags: usize,
    pub speed_removals: usize,
}

impl PipelineOutput {
    pub fn devices_skipped(&self) -> usize {
        self.skipped.len()
    }
}

/// Run every stage for one device's normalized sightings.
pub fn process_device(
    device_id: &str,
    sightings: &[NormalizedSighting],
    config: &ClassifierConfig,
    clusterer: &dyn SpatialClusterer,
) -> Result<DeviceOutcome, DeviceError> {
    let windows = segment_device(device_id, sightings, config);
    let labeled = label_windows(windows, config)?;

    let (stationary, mobile): (Vec<VisibilityWindow>, Vec<VisibilityWindow>) = {
        let mut stationary = Vec::new();
        let mut mobile = Vec::new();
        for lw in labeled {
            match lw.label {
                MotionLabel::Stationary => stationary.push(lw.window),
                MotionLabel::Mobile => mobile.push(lw.window),
            }
        }
        (stationary, mobile)
    };

    let mut static_location = aggregate_device(device_id, &stationary, config, clusterer)?;
    if let Some(location) = static_location.as_mut() {
        if flag_location_error(location, config) {
            log_warn!(
                "Static location for {} has error radius {:.1} m above {:.1} m",
                device_id,
                location.loc_error_m,
                config.r_stationary_m
            );
        }
    }

    let (mut track, speed_removals) = enforce_speed_cap(build_track(device_id, &mobile, config), config);
    if track.len() < 2 {
        track.clear();
    }

    Ok(DeviceOutcome {
        device_id: device_id.to_string(),
        static_location,
        track,
        stationary_windows: stationary.len(),
        mobile_windows: mobile.len(),
        speed_removals,
    })
}

/// Split normalized sightings (ordered by device) into per-device runs.
fn group_by_device(sightings: Vec<NormalizedSighting>) -> Vec<(String, Vec<NormalizedSighting>)> {
    let mut groups: Vec<(String, Vec<NormalizedSighting>)> = Vec::new();
    for sighting in sightings {
        match groups.last_mut() {
            Some((device_id, group)) if *device_id == sighting.device_id => group.push(sighting),
            _ => groups.push((sighting.device_id.clone(), vec![sighting])),
        }
    }
    groups
}

/// Normalize, classify and aggregate a mission's sightings.
///
/// Output ordering depends only on the input set, never on thread timing.
pub fn run_pipeline(
    sightings: Vec<Sighting>,
    config: &ClassifierConfig,
    clusterer: &dyn SpatialClusterer,
) -> PipelineOutput {
    let normalized = normalize(sightings);
    let sightings_normalized = normalized.len();
    let devices = group_by_device(normalized);
    log_info!("Processing {} devices", devices.len());

    let mut results: Vec<Result<DeviceOutcome, DeviceError>> = devices
        .par_iter()
        .map(|(device_id, sightings)| {
            // A custom clusterer may panic; that costs one device, not the run.
            panic::catch_unwind(AssertUnwindSafe(|| {
                process_device(device_id, sightings, config, clusterer)
            }))
            .unwrap_or_else(|payload| {
                Err(DeviceError::Panicked {
                    device_id: device_id.clone(),
                    detail: panic_detail(payload.as_ref()),
                })
            })
        })
        .collect();
    results.sort_by(|a, b| result_device_id(a).cmp(result_device_id(b)));

    let mut output = PipelineOutput {
        sightings_normalized,
        ..PipelineOutput::default()
    };
    let mut stationary_windows = 0;
    let mut mobile_windows = 0;

    for result in results {
        match result {
            Ok(outcome) => {
                output.devices_processed += 1;
                stationary_windows += outcome.stationary_windows;
                mobile_windows += outcome.mobile_windows;
                output.speed_removals += outcome.speed_removals;
                if let Some(location) = outcome.static_location {
                    if location.loc_error_flag {
                        output.location_flags += 1;
                    }
                    output.static_locations.push(location);
                }
                if !outcome.track.is_empty() {
                    output.mobile_tracks += 1;
                    output.track_points.extend(outcome.track);
                }
            }
            Err(err) => {
                log_warn!("Skipping device {}: {}", err.device_id(), err);
                output.skipped.push(err);
            }
        }
    }

    log_info!(
        "Split {} stationary and {} mobile windows",
        stationary_windows,
        mobile_windows
    );
    log_info!(
        "Aggregated {} static locations, {} mobile tracks ({} points); {} devices skipped",
        output.static_locations.len(),
        output.mobile_tracks,
        output.track_points.len(),
        output.devices_skipped()
    );

    output
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn result_device_id(result: &Result<DeviceOutcome, DeviceError>) -> &str {
    match result {
        Ok(outcome) => &outcome.device_id,
        Err(err) => err.device_id(),
    }
}
