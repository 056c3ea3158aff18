use anyhow::{Context, Result};
use rusqlite::{params, Row, Transaction};

use crate::db::{
    helpers::{parse_datetime, to_i64, to_u64},
    models::AnalysisSummary,
    Database,
};

fn row_to_run(row: &Row) -> Result<AnalysisSummary> {
    let started_at: String = row.get("started_at")?;
    let finished_at: String = row.get("finished_at")?;

    Ok(AnalysisSummary {
        run_id: row.get("id")?,
        mission: row.get("mission")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        finished_at: parse_datetime(&finished_at, "finished_at")?,
        sightings_loaded: to_u64(row.get("sightings_loaded")?, "sightings_loaded")?,
        sightings_normalized: to_u64(row.get("sightings_normalized")?, "sightings_normalized")?,
        devices_processed: to_u64(row.get("devices_processed")?, "devices_processed")?,
        devices_skipped: to_u64(row.get("devices_skipped")?, "devices_skipped")?,
        static_locations: to_u64(row.get("static_locations")?, "static_locations")?,
        mobile_tracks: to_u64(row.get("mobile_tracks")?, "mobile_tracks")?,
        track_points: to_u64(row.get("track_points")?, "track_points")?,
        location_flags: to_u64(row.get("location_flags")?, "location_flags")?,
        speed_removals: to_u64(row.get("speed_removals")?, "speed_removals")?,
    })
}

/// Record a run inside the caller's result transaction.
pub(super) fn insert_run(tx: &Transaction<'_>, run: &AnalysisSummary, config_json: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO analysis_runs (
            id,
            mission,
            started_at,
            finished_at,
            config_json,
            sightings_loaded,
            sightings_normalized,
            devices_processed,
            devices_skipped,
            static_locations,
            mobile_tracks,
            track_points,
            location_flags,
            speed_removals
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            run.run_id,
            run.mission,
            run.started_at.to_rfc3339(),
            run.finished_at.to_rfc3339(),
            config_json,
            to_i64(run.sightings_loaded)?,
            to_i64(run.sightings_normalized)?,
            to_i64(run.devices_processed)?,
            to_i64(run.devices_skipped)?,
            to_i64(run.static_locations)?,
            to_i64(run.mobile_tracks)?,
            to_i64(run.track_points)?,
            to_i64(run.location_flags)?,
            to_i64(run.speed_removals)?,
        ],
    )
    .with_context(|| format!("failed to record analysis run {}", run.run_id))?;
    Ok(())
}

impl Database {
    /// All committed runs of a mission, oldest first.
    pub async fn get_runs(&self, mission: &str) -> Result<Vec<AnalysisSummary>> {
        let mission = mission.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    mission,
                    started_at,
                    finished_at,
                    sightings_loaded,
                    sightings_normalized,
                    devices_processed,
                    devices_skipped,
                    static_locations,
                    mobile_tracks,
                    track_points,
                    location_flags,
                    speed_removals
                FROM analysis_runs
                WHERE mission = ?1
                ORDER BY started_at ASC",
            )?;

            let mut rows = stmt.query(params![mission])?;
            let mut runs = Vec::new();
            while let Some(row) = rows.next()? {
                runs.push(row_to_run(row)?);
            }
            Ok(runs)
        })
        .await
    }
}
