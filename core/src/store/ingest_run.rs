//! Store methods for ingestion run bookkeeping.

use crate::{error::ScoreResult, types::RunId};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::ScoreStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRunRecord {
    pub run_id: RunId,
    /// "tracts" or "datasets".
    pub kind: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_ids: u64,
    pub scored: u64,
    pub skipped: u64,
    pub invalid_ids: u64,
    pub malformed_cells: u64,
    pub dry_run: bool,
}

impl ScoreStore {
    pub fn insert_ingest_run(&self, run: &IngestRunRecord) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT INTO ingest_run
                (run_id, kind, started_at, finished_at, total_ids, scored, skipped,
                 invalid_ids, malformed_cells, dry_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run.run_id,
                run.kind,
                run.started_at,
                run.finished_at,
                run.total_ids as i64,
                run.scored as i64,
                run.skipped as i64,
                run.invalid_ids as i64,
                run.malformed_cells as i64,
                run.dry_run as i64,
            ],
        )?;
        Ok(())
    }

    /// Number of recorded ingestion runs (for tests and summaries).
    pub fn ingest_run_count(&self) -> ScoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ingest_run", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recent run, by start time.
    pub fn latest_ingest_run(&self) -> ScoreResult<Option<IngestRunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, kind, started_at, finished_at, total_ids, scored, skipped,
                    invalid_ids, malformed_cells, dry_run
             FROM ingest_run ORDER BY started_at DESC, rowid DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], |row| {
            Ok(IngestRunRecord {
                run_id: row.get(0)?,
                kind: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                total_ids: row.get::<_, i64>(4)? as u64,
                scored: row.get::<_, i64>(5)? as u64,
                skipped: row.get::<_, i64>(6)? as u64,
                invalid_ids: row.get::<_, i64>(7)? as u64,
                malformed_cells: row.get::<_, i64>(8)? as u64,
                dry_run: row.get::<_, i64>(9)? != 0,
            })
        })?;
        let latest = rows.next().transpose()?;
        Ok(latest)
    }
}
