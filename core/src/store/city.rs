//! Store methods for the city summary singleton.

use crate::{aggregate::CityStats, error::ScoreResult};
use rusqlite::{params, OptionalExtension};

use super::{now_rfc3339, ScoreStore};

impl ScoreStore {
    /// Replace the singleton summary wholesale.
    pub fn replace_city_stats(&self, stats: &CityStats) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO city_stats
                (id, equity_score, transit_coverage, high_risk_tracts, total_tracts, computed_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                stats.equity_score,
                stats.transit_coverage,
                stats.high_risk_tracts as i64,
                stats.total_tracts as i64,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The stored summary, or None if it has never been computed.
    pub fn city_stats(&self) -> ScoreResult<Option<CityStats>> {
        let stats = self
            .conn
            .query_row(
                "SELECT equity_score, transit_coverage, high_risk_tracts, total_tracts
                 FROM city_stats WHERE id = 1",
                [],
                |row| {
                    Ok(CityStats {
                        equity_score: row.get(0)?,
                        transit_coverage: row.get(1)?,
                        high_risk_tracts: row.get::<_, i64>(2)?.max(0) as u64,
                        total_tracts: row.get::<_, i64>(3)?.max(0) as u64,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }
}
