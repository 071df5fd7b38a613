//! Ingestion pipeline: source tables to persisted tract scores.
//!
//! STAGES (fixed order):
//!   1. Tract ingestion: merge the tract tables, score every surviving
//!      tract with the proxy path, upsert, recompute the city summary.
//!   2. Dataset enrichment: merge the enrichment tables, rescore matching
//!      stored tracts with the five-component formula, upsert, recompute
//!      the city summary.
//!
//! RULES:
//!   - A single bad row never aborts a run; it is counted and skipped.
//!   - The city summary is always recomputed from every stored tract,
//!     never from the batch just written.
//!   - Dry runs compute everything and write nothing.

use crate::{
    aggregate::{recompute_city_stats_with_threshold, CityStats},
    config::IngestConfig,
    error::{ScoreError, ScoreResult},
    merge::{merge_indicators, merge_tables, MergeReport},
    record::{RawIndicatorRecord, TractScoreRecord},
    scoring::{compute_full_equity_score, derive_tract_metrics, FullEquityInputs},
    source::{read_source_table, SourceTable},
    store::{IngestRunRecord, ScoreStore},
    types::RunId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What to do when a configured source file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTable {
    Fail,
    Skip,
}

/// Read every configured table from `data_dir`.
pub fn load_tables(
    data_dir: &Path,
    tables: &BTreeMap<String, String>,
    id_column: &str,
    missing: MissingTable,
) -> ScoreResult<Vec<SourceTable>> {
    let mut loaded = Vec::with_capacity(tables.len());
    for (field, file_name) in tables {
        let path = data_dir.join(file_name);
        if !path.exists() {
            match missing {
                MissingTable::Fail => {
                    return Err(ScoreError::MissingSource {
                        field: field.clone(),
                        path: path.display().to_string(),
                    })
                }
                MissingTable::Skip => {
                    log::warn!("{} not found; skipping {field}", path.display());
                    loaded.push(SourceTable::new(field.as_str()));
                    continue;
                }
            }
        }
        loaded.push(read_source_table(&path, field, &[field.as_str()], id_column)?);
    }
    Ok(loaded)
}

// ── Stage 1: tract ingestion ───────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TractIngest {
    /// Scored tracts, ordered by id.
    pub records: Vec<TractScoreRecord>,
    pub report: MergeReport,
}

/// Merge the tract tables and proxy-score every tract with data.
pub fn ingest_tracts(tables: &[SourceTable], config: &IngestConfig) -> TractIngest {
    let outcome = merge_tables(tables);
    let records: Vec<TractScoreRecord> = outcome
        .records
        .iter()
        .map(|raw| derive_tract_metrics(raw, config))
        .collect();

    log::info!(
        "tracts parsed: {} valid, {} skipped, {} invalid ids",
        records.len(),
        outcome.report.skipped,
        outcome.report.invalid_ids
    );

    TractIngest {
        records,
        report: outcome.report,
    }
}

// ── Stage 2: dataset enrichment ────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DatasetEnrichment {
    /// Every existing tract, rescored, in input order.
    pub records: Vec<TractScoreRecord>,
    /// Tracts with no row in any enrichment table, scored from fallbacks.
    pub unmatched: usize,
    pub income_min: f64,
    pub income_max: f64,
    pub report: MergeReport,
}

/// Rescore every `existing` tract with the five-component formula.
///
/// The income range is taken over positive incomes in the enrichment
/// data, falling back to the configured range when there are none.
/// A tract missing from the enrichment data is still rescored: each
/// absent input takes its fallback, and LILA defaults to false. A
/// stored supply or transit score of zero or less is replaced by its
/// fallback before scoring.
pub fn enrich_with_datasets(
    existing: &[TractScoreRecord],
    tables: &[SourceTable],
    config: &IngestConfig,
) -> DatasetEnrichment {
    let (merged, report) = merge_indicators(tables);
    let fallbacks = &config.fallbacks;

    let incomes: Vec<f64> = merged
        .values()
        .filter_map(|r| r.median_income)
        .filter(|v| *v > 0.0)
        .collect();
    let (income_min, income_max) = if incomes.is_empty() {
        (fallbacks.income_min, fallbacks.income_max)
    } else {
        (
            incomes.iter().copied().fold(f64::INFINITY, f64::min),
            incomes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };
    log::info!("income range: ${income_min:.0} - ${income_max:.0}");

    let mut records = Vec::new();
    let mut unmatched = 0usize;

    for tract in existing {
        let raw = merged.get(&tract.tract_id);
        if raw.is_none() {
            unmatched += 1;
        }

        let median_income = raw
            .and_then(|r| r.median_income)
            .filter(|v| *v > 0.0)
            .unwrap_or(fallbacks.income);
        let food_spend = raw
            .and_then(|r| r.food_spend)
            .filter(|v| *v > 0.0)
            .unwrap_or(fallbacks.enrichment_food_spend);
        let food_insecurity_rate = raw
            .and_then(|r| r.food_insecurity_rate)
            .unwrap_or(fallbacks.food_insecurity_rate);
        let lila = raw.is_some_and(RawIndicatorRecord::lila_flag);
        let supply_score = positive_or(tract.supply_score, fallbacks.supply_score);
        let transit_coverage = positive_or(tract.transit_coverage, fallbacks.transit_coverage);

        let score = compute_full_equity_score(&FullEquityInputs {
            food_insecurity_rate,
            median_income,
            food_spend,
            lila,
            supply_score,
            transit_coverage,
            income_min,
            income_max,
        });

        let mut updated = tract.clone();
        updated.food_risk_score = score.food_risk_score;
        updated.equity_score = score.equity_score;
        updated.need_score = score.need_score;
        updated.vulnerability_index = score.vulnerability_index;
        updated.equity_components = Some(score.components);
        updated.lila_flag = lila;
        updated.raw.mhhinc = median_income;
        updated.raw.food_avg = food_spend;
        updated.raw.p_fi_rate = Some(food_insecurity_rate);
        updated.raw.lila = lila;
        records.push(updated);
    }

    if unmatched > 0 {
        log::info!("{unmatched} tracts had no enrichment rows; scored from fallbacks");
    }

    DatasetEnrichment {
        records,
        unmatched,
        income_min,
        income_max,
        report,
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        fallback
    }
}

// ── Persistence ────────────────────────────────────────────────────

/// Upsert `records`, then recompute and replace the city summary from
/// every stored tract.
pub fn persist_tracts(
    store: &ScoreStore,
    records: &[TractScoreRecord],
    config: &IngestConfig,
) -> ScoreResult<CityStats> {
    store.upsert_tracts(records)?;
    recompute_stored_city_stats(store, config)
}

pub fn recompute_stored_city_stats(
    store: &ScoreStore,
    config: &IngestConfig,
) -> ScoreResult<CityStats> {
    let all = store.all_tracts()?;
    let stats =
        recompute_city_stats_with_threshold(&all, config.aggregate.city_high_risk_threshold);
    store.replace_city_stats(&stats)?;
    log::info!(
        "city stats updated: equity={:.4} transit={:.4} high_risk={} total={}",
        stats.equity_score,
        stats.transit_coverage,
        stats.high_risk_tracts,
        stats.total_tracts
    );
    Ok(stats)
}

// ── Runs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Tracts,
    Datasets,
}

impl RunKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tracts => "tracts",
            Self::Datasets => "datasets",
        }
    }
}

/// Outcome of one ingestion run, surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub kind: RunKind,
    pub dry_run: bool,
    pub scored: usize,
    /// Tracts excluded from scoring for lack of data. Always 0 for
    /// enrichment, which rescores every stored tract.
    pub skipped: usize,
    pub report: MergeReport,
    /// None for dry runs.
    pub city_stats: Option<CityStats>,
    pub sample: Option<TractScoreRecord>,
}

/// Stage 1 end to end: read files, score, and (unless dry) persist.
pub fn run_tract_ingestion(
    store: &ScoreStore,
    data_dir: &Path,
    config: &IngestConfig,
    dry_run: bool,
) -> ScoreResult<RunSummary> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let tables = load_tables(
        data_dir,
        &config.sources.tract_tables,
        &config.sources.id_column,
        MissingTable::Fail,
    )?;
    let ingest = ingest_tracts(&tables, config);

    let mut summary = RunSummary {
        run_id: new_run_id(),
        kind: RunKind::Tracts,
        dry_run,
        scored: ingest.records.len(),
        skipped: ingest.report.skipped,
        report: ingest.report.clone(),
        city_stats: None,
        sample: ingest.records.first().cloned(),
    };
    if dry_run {
        return Ok(summary);
    }

    summary.city_stats = Some(persist_tracts(store, &ingest.records, config)?);
    record_run(store, &summary, started_at)?;
    Ok(summary)
}

/// Stage 2 end to end. Requires stage 1 to have populated the store.
pub fn run_dataset_enrichment(
    store: &ScoreStore,
    data_dir: &Path,
    config: &IngestConfig,
    dry_run: bool,
) -> ScoreResult<RunSummary> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let tables = load_tables(
        data_dir,
        &config.sources.dataset_tables,
        &config.sources.id_column,
        MissingTable::Skip,
    )?;
    let existing = if tables.iter().all(SourceTable::is_empty) {
        log::warn!("no enrichment datasets loaded; nothing to do");
        Vec::new()
    } else {
        store.all_tracts()?
    };
    if existing.is_empty() {
        log::warn!("no tracts to enrich");
    }

    let enrichment = enrich_with_datasets(&existing, &tables, config);

    let mut summary = RunSummary {
        run_id: new_run_id(),
        kind: RunKind::Datasets,
        dry_run,
        scored: enrichment.records.len(),
        skipped: 0,
        report: enrichment.report.clone(),
        city_stats: None,
        sample: enrichment.records.first().cloned(),
    };
    if dry_run || enrichment.records.is_empty() {
        return Ok(summary);
    }

    summary.city_stats = Some(persist_tracts(store, &enrichment.records, config)?);
    record_run(store, &summary, started_at)?;
    Ok(summary)
}

fn new_run_id() -> RunId {
    format!("ingest-{}", uuid::Uuid::new_v4())
}

fn record_run(store: &ScoreStore, summary: &RunSummary, started_at: String) -> ScoreResult<()> {
    store.insert_ingest_run(&IngestRunRecord {
        run_id: summary.run_id.clone(),
        kind: summary.kind.name().to_string(),
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
        total_ids: summary.report.total_ids as u64,
        scored: summary.scored as u64,
        skipped: summary.skipped as u64,
        invalid_ids: summary.report.invalid_ids as u64,
        malformed_cells: summary.report.malformed_cells as u64,
        dry_run: summary.dry_run,
    })
}
