use anyhow::{Context, Result};
use rusqlite::{params, Row};

use super::runs::insert_run;
use crate::db::{
    models::{AnalysisSummary, StaticLocation, TrackPoint},
    Database,
};

fn row_to_static_location(row: &Row) -> Result<StaticLocation, rusqlite::Error> {
    Ok(StaticLocation {
        device_id: row.get("mac")?,
        lat_mean: row.get("lat_mean")?,
        lon_mean: row.get("lon_mean")?,
        loc_error_m: row.get("loc_error_m")?,
        first_seen: row.get("first_seen")?,
        last_seen: row.get("last_seen")?,
        n_obs: row.get("n_obs")?,
        n_clusters: row.get("n_clusters")?,
        loc_error_flag: row.get("loc_error_flag")?,
    })
}

fn row_to_track_point(row: &Row) -> Result<TrackPoint, rusqlite::Error> {
    Ok(TrackPoint {
        device_id: row.get("mac")?,
        timestamp: row.get("ts")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
    })
}

impl Database {
    /// Replace a mission's derived tables and record the run, all in one
    /// transaction. On any error the previous results stay in place.
    pub async fn replace_results(
        &self,
        run: &AnalysisSummary,
        config_json: &str,
        static_locations: Vec<StaticLocation>,
        track_points: Vec<TrackPoint>,
    ) -> Result<()> {
        let run = run.clone();
        let config_json = config_json.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open results transaction")?;

            tx.execute("DELETE FROM static_ap WHERE mission = ?1", params![run.mission])
                .context("failed to clear static_ap")?;
            tx.execute("DELETE FROM mobile_track WHERE mission = ?1", params![run.mission])
                .context("failed to clear mobile_track")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO static_ap (
                        mission,
                        mac,
                        lat_mean,
                        lon_mean,
                        loc_error_m,
                        first_seen,
                        last_seen,
                        n_obs,
                        n_clusters,
                        loc_error_flag
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )?;
                for location in &static_locations {
                    stmt.execute(params![
                        run.mission,
                        location.device_id,
                        location.lat_mean,
                        location.lon_mean,
                        location.loc_error_m,
                        location.first_seen,
                        location.last_seen,
                        location.n_obs,
                        location.n_clusters,
                        location.loc_error_flag,
                    ])
                    .with_context(|| format!("failed to insert static location {}", location.device_id))?;
                }
            }

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO mobile_track (mission, mac, ts, lat, lon)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for point in &track_points {
                    stmt.execute(params![
                        run.mission,
                        point.device_id,
                        point.timestamp,
                        point.lat,
                        point.lon,
                    ])
                    .with_context(|| {
                        format!(
                            "failed to insert track point {} at {}",
                            point.device_id, point.timestamp
                        )
                    })?;
                }
            }

            insert_run(&tx, &run, &config_json)?;

            tx.commit().context("failed to commit analysis results")?;
            Ok(())
        })
        .await
    }

    pub async fn get_static_locations(&self, mission: &str) -> Result<Vec<StaticLocation>> {
        let mission = mission.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    mac,
                    lat_mean,
                    lon_mean,
                    loc_error_m,
                    first_seen,
                    last_seen,
                    n_obs,
                    n_clusters,
                    loc_error_flag
                FROM static_ap
                WHERE mission = ?1
                ORDER BY mac ASC",
            )?;

            let locations_iter = stmt.query_map(params![mission], |row| row_to_static_location(row))?;

            let mut locations = Vec::new();
            for location_result in locations_iter {
                locations.push(location_result?);
            }

            Ok(locations)
        })
        .await
    }

    /// Track points of a mission ordered by device, then time.
    pub async fn get_mobile_tracks(&self, mission: &str) -> Result<Vec<TrackPoint>> {
        let mission = mission.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT mac, ts, lat, lon
                FROM mobile_track
                WHERE mission = ?1
                ORDER BY mac ASC, ts ASC",
            )?;

            let points_iter = stmt.query_map(params![mission], |row| row_to_track_point(row))?;

            let mut points = Vec::new();
            for point_result in points_iter {
                points.push(point_result?);
            }

            Ok(points)
        })
        .await
    }
}
