//! The "analyze" operation: load a mission's sightings, run the classifier,
//! and commit static locations and mobile tracks in one transaction.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use uuid::Uuid;

use crate::classifier::{run_pipeline, ClassifierConfig, Dbscan, SpatialClusterer};
use crate::db::models::{AnalysisSummary, TimeRange};
use crate::db::Database;
use crate::error::{AnalysisError, Result};
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeRequest {
    pub mission: String,
    pub time_range: TimeRange,
}

impl AnalyzeRequest {
    pub fn new(mission: impl Into<String>) -> Self {
        Self {
            mission: mission.into(),
            time_range: TimeRange::all(),
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }
}

/// Analyze a mission with the default DBSCAN clusterer.
pub async fn analyze(
    db: &Database,
    request: &AnalyzeRequest,
    config: &ClassifierConfig,
) -> Result<AnalysisSummary> {
    let clusterer = Arc::new(Dbscan::new(config.cluster_min_points));
    analyze_with(db, request, config, clusterer).await
}

/// Analyze a mission with a caller-supplied clustering strategy.
///
/// Fatal errors (bad configuration, no data, storage failure) return before
/// anything is written, leaving the previous results authoritative.
pub async fn analyze_with(
    db: &Database,
    request: &AnalyzeRequest,
    config: &ClassifierConfig,
    clusterer: Arc<dyn SpatialClusterer>,
) -> Result<AnalysisSummary> {
    config.validate()?;
    let started_at = Utc::now();
    let mission = request.mission.clone();

    log_info!(
        "Analyze: mission={}, from={:?}, to={:?}",
        mission,
        request.time_range.from,
        request.time_range.to
    );

    if !db.mission_exists(&mission).await? {
        return Err(AnalysisError::MissingMissionData { mission });
    }
    let sightings = db.load_sightings(&mission, request.time_range).await?;
    if sightings.is_empty() {
        return Err(AnalysisError::MissingMissionData { mission });
    }
    let sightings_loaded = sightings.len();
    log_info!("Loaded {} sightings", sightings_loaded);

    let pipeline_config = config.clone();
    let output = tokio::task::spawn_blocking(move || {
        run_pipeline(sightings, &pipeline_config, clusterer.as_ref())
    })
    .await
    .map_err(|err| AnalysisError::Worker(err.to_string()))?;

    let summary = AnalysisSummary {
        run_id: Uuid::new_v4().to_string(),
        mission: mission.clone(),
        started_at,
        finished_at: Utc::now(),
        sightings_loaded: sightings_loaded as u64,
        sightings_normalized: output.sightings_normalized as u64,
        devices_processed: output.devices_processed as u64,
        devices_skipped: output.devices_skipped() as u64,
        static_locations: output.static_locations.len() as u64,
        mobile_tracks: output.mobile_tracks as u64,
        track_points: output.track_points.len() as u64,
        location_flags: output.location_flags as u64,
        speed_removals: output.speed_removals as u64,
    };

    let config_json = serde_json::to_string(config)
        .context("failed to serialize classifier config")?;
    if let Err(err) = db
        .replace_results(&summary, &config_json, output.static_locations, output.track_points)
        .await
    {
        log_error!(
            "Commit failed for mission {} ({} devices skipped): {:#}",
            summary.mission,
            summary.devices_skipped,
            err
        );
        return Err(err.into());
    }

    log_info!(
        "Classification complete: {} processed, {} skipped, {} quality flags",
        summary.devices_processed,
        summary.devices_skipped,
        summary.quality_flags()
    );

    Ok(summary)
}
