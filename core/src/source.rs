//! Tabular source reader for the two-row-header export convention.
//!
//! Every export follows the same layout:
//!   - Row 0: human-readable column descriptions (skipped)
//!   - Row 1: short technical column names (GeoID, rpopden, mhhinc, ...)
//!   - Row 2+: data rows
//!
//! Cells are kept as raw strings here; numeric cleaning happens in the
//! merger so that a malformed cell resolves to `None` for one tract
//! instead of failing the whole table.

use crate::error::{ScoreError, ScoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One independently sourced indicator table: tract id -> field -> raw cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub name: String,
    pub rows: BTreeMap<String, BTreeMap<String, String>>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Build a single-field table from `(id, raw)` pairs.
    pub fn single_field<I, K, V>(field: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new(field);
        for (id, raw) in rows {
            table.insert(id, field, raw);
        }
        table
    }

    /// Later inserts for the same (id, field) replace earlier ones.
    pub fn insert(&mut self, id: impl Into<String>, field: &str, raw: impl Into<String>) {
        self.rows
            .entry(id.into())
            .or_default()
            .insert(field.to_string(), raw.into());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a numeric export cell.
///
/// Handles `"$151,466"` -> 151466.0, `"23.43%"` -> 23.43, plain numbers,
/// and the empty / `N/A` / `NULL` sentinels -> `None`.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_matches('"').trim();
    if is_null_sentinel(s) {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// True for the cell values the exports use to mean "no data".
pub fn is_null_sentinel(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("N/A")
        || s.eq_ignore_ascii_case("NULL")
}

/// Interpret a low-income-low-access designation cell.
///
/// Text exports say "Low Income and Low Access" or "Not Low Income and
/// Low Access"; numeric exports use 1 / 0.
pub fn parse_lila_flag(raw: &str) -> bool {
    let s = raw.trim().trim_matches('"').trim();
    if s.contains("Low Income and Low Access") {
        return !s.contains("Not");
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") {
        return true;
    }
    clean_numeric(s).is_some_and(|v| v >= 1.0)
}

/// Read `fields` out of an export file, keyed by `id_column`.
///
/// Rows too short to hold the id or a field are skipped, as are rows with
/// an empty id. Id format validation is left to the merger.
pub fn read_source_table(
    path: &Path,
    name: &str,
    fields: &[&str],
    id_column: &str,
) -> ScoreResult<SourceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let mut table = SourceTable::new(name);

    // Row 0: descriptive header.
    if records.next().transpose()?.is_none() {
        return Ok(table);
    }
    // Row 1: technical header.
    let headers: Vec<String> = match records.next().transpose()? {
        Some(row) => row.iter().map(clean_header).collect(),
        None => return Ok(table),
    };

    let id_idx = headers.iter().position(|h| h == id_column).ok_or_else(|| {
        ScoreError::MissingSource {
            field: id_column.to_string(),
            path: path.display().to_string(),
        }
    })?;
    let mut field_idx = Vec::with_capacity(fields.len());
    for field in fields {
        match headers.iter().position(|h| h == field) {
            Some(i) => field_idx.push((*field, i)),
            None => log::warn!("column '{field}' not found in {}", path.display()),
        }
    }
    if field_idx.is_empty() {
        return Ok(table);
    }

    for row in records {
        let row = row?;
        let id = match row.get(id_idx) {
            Some(id) => clean_header(id),
            None => continue,
        };
        if id.is_empty() {
            continue;
        }
        for (field, idx) in &field_idx {
            if let Some(cell) = row.get(*idx) {
                table.insert(id.clone(), field, cell.trim().trim_matches('"').trim());
            }
        }
    }

    log::info!("loaded {name}: {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn clean_header(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_are_cleaned() {
        assert_eq!(clean_numeric("$151,466"), Some(151_466.0));
        assert_eq!(clean_numeric("23.43%"), Some(23.43));
        assert_eq!(clean_numeric(" 17264.96 "), Some(17_264.96));
        assert_eq!(clean_numeric("N/A"), None);
        assert_eq!(clean_numeric("null"), None);
        assert_eq!(clean_numeric(""), None);
        assert_eq!(clean_numeric("abc"), None);
    }

    #[test]
    fn lila_text_and_numeric_forms() {
        assert!(parse_lila_flag("Low Income and Low Access"));
        assert!(!parse_lila_flag("Not Low Income and Low Access"));
        assert!(parse_lila_flag("1"));
        assert!(!parse_lila_flag("0"));
        assert!(parse_lila_flag("true"));
        assert!(!parse_lila_flag(""));
    }
}
