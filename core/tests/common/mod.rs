#![allow(dead_code)]

use foodgrid_core::record::{Provenance, TractScoreRecord};
use foodgrid_core::types::tract_name;
use std::path::Path;

/// A stored-looking tract with the given headline scores.
pub fn tract(
    tract_id: &str,
    population: u64,
    food_risk_score: f64,
    equity_score: f64,
    transit_coverage: f64,
) -> TractScoreRecord {
    TractScoreRecord {
        tract_id: tract_id.to_string(),
        tract_name: tract_name(tract_id),
        need_score: 0.6,
        supply_score: 0.5,
        transit_coverage,
        vulnerability_index: 0.3,
        food_risk_score,
        equity_score,
        equity_components: None,
        food_insecurity_rate: 0.22,
        poverty_rate: 0.18,
        snap_rate: 0.2343,
        population,
        lila_flag: false,
        raw: Provenance {
            mhhinc: 55_000.0,
            rpopden: 20_000.0,
            food_avg: 9_000.0,
            lila: false,
            lowmod_hh: 75.0,
            p_fi_rate: None,
        },
    }
}

/// Write a two-row-header export: descriptive row, technical row, data.
pub fn write_export(dir: &Path, file_name: &str, field: &str, rows: &[(&str, &str)]) {
    let mut out = String::new();
    out.push_str(&format!("\"Geographic Identifier\",\"Description of {field}\"\n"));
    out.push_str(&format!("\"GeoID\",\"{field}\"\n"));
    for (id, value) in rows {
        out.push_str(&format!("\"{id}\",\"{value}\"\n"));
    }
    std::fs::write(dir.join(file_name), out).expect("write export");
}
