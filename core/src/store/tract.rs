//! Store methods for per-tract score documents.

use crate::{
    error::{ScoreError, ScoreResult},
    record::{EquityComponents, Provenance, TractScoreRecord},
};
use rusqlite::{params, OptionalExtension, Row};

use super::{now_rfc3339, ScoreStore};

const TRACT_COLUMNS: &str = "tract_id, tract_name, need_score, supply_score, transit_coverage,
     vulnerability_index, food_risk_score, equity_score, equity_components,
     food_insecurity_rate, poverty_rate, snap_rate, population, lila_flag, raw_json";

/// Row as read from SQLite, before the JSON columns are decoded.
struct TractRow {
    record: TractScoreRecord,
    equity_components: Option<String>,
    raw_json: String,
}

impl TractRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record: TractScoreRecord {
                tract_id: row.get(0)?,
                tract_name: row.get(1)?,
                need_score: row.get(2)?,
                supply_score: row.get(3)?,
                transit_coverage: row.get(4)?,
                vulnerability_index: row.get(5)?,
                food_risk_score: row.get(6)?,
                equity_score: row.get(7)?,
                equity_components: None,
                food_insecurity_rate: row.get(9)?,
                poverty_rate: row.get(10)?,
                snap_rate: row.get(11)?,
                population: row.get::<_, i64>(12)?.max(0) as u64,
                lila_flag: row.get::<_, i64>(13)? != 0,
                raw: Provenance::default(),
            },
            equity_components: row.get(8)?,
            raw_json: row.get(14)?,
        })
    }

    fn decode(self) -> ScoreResult<TractScoreRecord> {
        let mut record = self.record;
        record.raw = serde_json::from_str(&self.raw_json)?;
        record.equity_components = match self.equity_components {
            Some(json) => Some(serde_json::from_str::<EquityComponents>(&json)?),
            None => None,
        };
        Ok(record)
    }
}

impl ScoreStore {
    /// Insert or fully replace one tract document.
    pub fn upsert_tract(&self, tract: &TractScoreRecord) -> ScoreResult<()> {
        let components = tract
            .equity_components
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let raw_json = serde_json::to_string(&tract.raw)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO tract_score
                (tract_id, tract_name, need_score, supply_score, transit_coverage,
                 vulnerability_index, food_risk_score, equity_score, equity_components,
                 food_insecurity_rate, poverty_rate, snap_rate, population, lila_flag,
                 raw_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                tract.tract_id,
                tract.tract_name,
                tract.need_score,
                tract.supply_score,
                tract.transit_coverage,
                tract.vulnerability_index,
                tract.food_risk_score,
                tract.equity_score,
                components,
                tract.food_insecurity_rate,
                tract.poverty_rate,
                tract.snap_rate,
                i64::try_from(tract.population).unwrap_or(i64::MAX),
                tract.lila_flag as i64,
                raw_json,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Upsert many tracts in one transaction. Returns the number written.
    pub fn upsert_tracts(&self, tracts: &[TractScoreRecord]) -> ScoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for tract in tracts {
            self.upsert_tract(tract)?;
        }
        tx.commit()?;
        log::debug!("upserted {} tracts", tracts.len());
        Ok(tracts.len())
    }

    pub fn get_tract(&self, tract_id: &str) -> ScoreResult<Option<TractScoreRecord>> {
        let sql = format!("SELECT {TRACT_COLUMNS} FROM tract_score WHERE tract_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![tract_id], TractRow::from_row)
            .optional()?;
        row.map(TractRow::decode).transpose()
    }

    /// Like `get_tract`, but a missing tract is an error.
    pub fn require_tract(&self, tract_id: &str) -> ScoreResult<TractScoreRecord> {
        self.get_tract(tract_id)?
            .ok_or_else(|| ScoreError::TractNotFound {
                tract_id: tract_id.to_string(),
            })
    }

    /// Every stored tract, ordered by id.
    pub fn all_tracts(&self) -> ScoreResult<Vec<TractScoreRecord>> {
        let sql = format!("SELECT {TRACT_COLUMNS} FROM tract_score ORDER BY tract_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], TractRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TractRow::decode).collect()
    }

    pub fn tract_count(&self) -> ScoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tract_score", [], |row| row.get(0))?;
        Ok(count)
    }
}
