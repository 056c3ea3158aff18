use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    models::{Sighting, TimeRange},
    Database,
};

fn row_to_sighting(row: &Row) -> Result<Sighting, rusqlite::Error> {
    Ok(Sighting {
        id: row.get("id")?,
        device_id: row.get("mac")?,
        session_id: row.get("session_id")?,
        timestamp: row.get("ts")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
        signal_dbm: row.get("rssi")?,
        channel: row.get("channel")?,
        frequency: row.get("frequency")?,
    })
}

impl Database {
    /// Batch insert sightings in a single transaction.
    pub async fn insert_sightings(&self, sightings: &[Sighting]) -> Result<usize> {
        let sightings = sightings.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO observations (
                        mac,
                        session_id,
                        ts,
                        lat,
                        lon,
                        rssi,
                        channel,
                        frequency
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;

                for sighting in &sightings {
                    stmt.execute(params![
                        sighting.device_id,
                        sighting.session_id,
                        sighting.timestamp,
                        sighting.lat,
                        sighting.lon,
                        sighting.signal_dbm,
                        sighting.channel,
                        sighting.frequency,
                    ])
                    .with_context(|| {
                        format!(
                            "failed to insert sighting of {} at {}",
                            sighting.device_id, sighting.timestamp
                        )
                    })?;
                }
            }
            tx.commit().context("failed to commit sightings")?;
            Ok(sightings.len())
        })
        .await
    }

    /// Load every sighting of a mission inside `range`, ordered by (device, time).
    pub async fn load_sightings(&self, mission: &str, range: TimeRange) -> Result<Vec<Sighting>> {
        let mission = mission.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    o.id,
                    o.mac,
                    o.session_id,
                    o.ts,
                    o.lat,
                    o.lon,
                    o.rssi,
                    o.channel,
                    o.frequency
                FROM observations o
                JOIN sessions s ON s.id = o.session_id
                WHERE s.mission = ?1
                  AND (?2 IS NULL OR o.ts >= ?2)
                  AND (?3 IS NULL OR o.ts <= ?3)
                ORDER BY o.mac ASC, o.ts ASC, o.id ASC",
            )?;

            let sightings_iter = stmt.query_map(params![mission, range.from, range.to], |row| {
                row_to_sighting(row)
            })?;

            let mut sightings = Vec::new();
            for sighting_result in sightings_iter {
                sightings.push(sighting_result.context("failed to read sighting row")?);
            }

            Ok(sightings)
        })
        .await
    }
}
