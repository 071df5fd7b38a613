//! Indicator merger: N source tables in, one raw record per tract out.
//!
//! RULES:
//!   - The output id set is the union of valid ids across all tables.
//!   - An id failing format validation is dropped from that table only.
//!   - Missing or malformed cells stay `None`; no defaulting here.
//!   - A present value is never overwritten by a later empty cell.
//!   - A tract with every primary indicator missing is skipped, not scored.
//!
//! Pure transform: counts are returned in `MergeReport`, never only logged.

use crate::{
    config::fields,
    record::RawIndicatorRecord,
    source::{clean_numeric, is_null_sentinel, SourceTable},
    types::{is_valid_tract_id, TractId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Distinct valid ids observed across all tables.
    pub total_ids: usize,
    /// Tracts excluded because every primary indicator was missing.
    pub skipped: usize,
    /// Rows dropped for failing id validation (counted per table row).
    pub invalid_ids: usize,
    /// Cells present in a table but not parseable as a number.
    pub malformed_cells: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Ordered by tract id.
    pub records: Vec<RawIndicatorRecord>,
    pub report: MergeReport,
}

/// Union of all tables without the primary-indicator filter.
/// The enrichment stage uses this; it scores tracts that already exist.
pub fn merge_indicators(
    tables: &[SourceTable],
) -> (BTreeMap<TractId, RawIndicatorRecord>, MergeReport) {
    let mut merged: BTreeMap<TractId, RawIndicatorRecord> = BTreeMap::new();
    let mut report = MergeReport::default();

    for table in tables {
        let mut dropped = 0usize;
        for (id, cells) in &table.rows {
            let id = id.trim();
            if !is_valid_tract_id(id) {
                dropped += 1;
                continue;
            }
            let record = merged
                .entry(id.to_string())
                .or_insert_with(|| RawIndicatorRecord::new(id));
            for (field, raw) in cells {
                if !apply_cell(record, field, raw) {
                    report.malformed_cells += 1;
                }
            }
        }
        if dropped > 0 {
            log::debug!("{}: dropped {dropped} rows with invalid ids", table.name);
        }
        report.invalid_ids += dropped;
    }

    report.total_ids = merged.len();
    (merged, report)
}

/// Merge every table and drop tracts with no usable primary indicator.
pub fn merge_tables(tables: &[SourceTable]) -> MergeOutcome {
    let (merged, mut report) = merge_indicators(tables);

    let mut records = Vec::with_capacity(merged.len());
    for (id, record) in merged {
        if record.primary_indicators_missing() {
            log::debug!("tract {id}: no primary indicators; skipped");
            report.skipped += 1;
            continue;
        }
        records.push(record);
    }

    MergeOutcome { records, report }
}

/// Write one raw cell into the record. Returns false when a numeric cell
/// is present but cannot be parsed; sentinel cells are not malformed.
fn apply_cell(record: &mut RawIndicatorRecord, field: &str, raw: &str) -> bool {
    if field == fields::LILA {
        let raw = raw.trim();
        if !is_null_sentinel(raw) {
            record.lila_raw = Some(raw.to_string());
        }
        return true;
    }

    let slot = match field {
        fields::MHHINC => &mut record.median_income,
        fields::RPOPDEN => &mut record.population_density,
        fields::FOOD_AVG => &mut record.food_spend,
        fields::LOWMOD_HH => &mut record.lowmod_pct,
        fields::P_FI_RATE => &mut record.food_insecurity_rate,
        other => {
            log::debug!("ignoring unrecognised field '{other}'");
            return true;
        }
    };

    match clean_numeric(raw) {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => is_null_sentinel(raw.trim().trim_matches('"')),
    }
}
