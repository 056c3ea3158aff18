use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{models::Session, Database};

impl Database {
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, mission, src_file, sha256, start_ts, end_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.mission,
                    record.src_file,
                    record.sha256,
                    record.start_ts,
                    record.end_ts,
                ],
            )
            .with_context(|| format!("failed to insert session {}", record.id))?;
            Ok(())
        })
        .await
    }

    pub async fn mission_exists(&self, mission: &str) -> Result<bool> {
        let mission = mission.to_string();
        self.execute(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sessions WHERE mission = ?1)",
                    params![mission],
                    |row| row.get(0),
                )
                .context("failed to look up mission")?;
            Ok(exists)
        })
        .await
    }
}
