//! End-to-end ingestion: export files on disk through both stages into
//! the store, plus the pure enrichment transform.

mod common;

use common::{tract, write_export};
use foodgrid_core::{
    config::{fields, IngestConfig},
    error::ScoreError,
    pipeline::{
        enrich_with_datasets, ingest_tracts, run_dataset_enrichment, run_tract_ingestion,
        RunKind,
    },
    source::SourceTable,
    store::ScoreStore,
};
use std::path::Path;

const DESERT: &str = "25025000101";
const AFFLUENT: &str = "25025010100";
const PARK: &str = "25025990000";

fn store() -> ScoreStore {
    let store = ScoreStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

/// Stage 1 exports: a food desert, an affluent tract, a park with no
/// data, and one malformed id.
fn write_tract_exports(dir: &Path) {
    write_export(
        dir,
        "mhhinc.csv",
        fields::MHHINC,
        &[(DESERT, "$23,000"), (AFFLUENT, "$250,000"), (PARK, "N/A"), ("BADID", "$1")],
    );
    write_export(
        dir,
        "popden.csv",
        fields::RPOPDEN,
        &[(DESERT, "40,000"), (AFFLUENT, "40000"), (PARK, "N/A")],
    );
    write_export(
        dir,
        "food_avg.csv",
        fields::FOOD_AVG,
        &[(DESERT, "$6,000"), (AFFLUENT, "$16,000"), (PARK, "")],
    );
    write_export(
        dir,
        "lila.csv",
        fields::LILA,
        &[
            (DESERT, "Low Income and Low Access"),
            (AFFLUENT, "Not Low Income and Low Access"),
        ],
    );
    write_export(
        dir,
        "lowmod.csv",
        fields::LOWMOD_HH,
        &[(DESERT, "100%"), (AFFLUENT, "150%")],
    );
}

/// Stage 2 exports not shared with stage 1.
fn write_dataset_exports(dir: &Path) {
    write_export(
        dir,
        "p_fi_rate.csv",
        fields::P_FI_RATE,
        &[(DESERT, "30%"), (AFFLUENT, "5"), ("25025000999", "12")],
    );
    write_export(dir, "lila_flag.csv", fields::LILA, &[(DESERT, "1"), (AFFLUENT, "0")]);
}

#[test]
fn tract_stage_scores_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    let config = IngestConfig::default_test();
    let store = store();

    let summary = run_tract_ingestion(&store, dir.path(), &config, false).unwrap();

    assert_eq!(summary.kind, RunKind::Tracts);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.skipped, 1, "the park has no primary indicators");
    assert_eq!(summary.report.invalid_ids, 1);
    assert!(summary.run_id.starts_with("ingest-"));

    let desert = store.require_tract(DESERT).unwrap();
    assert_eq!(desert.food_risk_score, 0.7059);
    assert_eq!(desert.equity_score, 0.0);
    assert_eq!(desert.population, 18_000);
    assert!(desert.lila_flag);

    let affluent = store.require_tract(AFFLUENT).unwrap();
    assert_eq!(affluent.tract_name, "Census Tract 101");
    assert_eq!(affluent.food_risk_score, 0.0059);
    assert_eq!(affluent.equity_score, 1.0);

    assert!(store.get_tract(PARK).unwrap().is_none());

    let stats = store.city_stats().unwrap().unwrap();
    assert_eq!(Some(stats.clone()), summary.city_stats);
    assert_eq!(stats.total_tracts, 2);
    assert_eq!(stats.high_risk_tracts, 0);
    assert_eq!(stats.equity_score, 0.5);
    assert_eq!(stats.transit_coverage, 1.0);

    assert_eq!(store.ingest_run_count().unwrap(), 1);
}

/// A dry run computes the same scores but writes nothing.
#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    let config = IngestConfig::default_test();
    let store = store();

    let summary = run_tract_ingestion(&store, dir.path(), &config, true).unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.sample.map(|s| s.tract_id).as_deref(), Some(DESERT));
    assert!(summary.city_stats.is_none());
    assert_eq!(store.tract_count().unwrap(), 0);
    assert_eq!(store.city_stats().unwrap(), None);
    assert_eq!(store.ingest_run_count().unwrap(), 0);
}

#[test]
fn missing_tract_export_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    std::fs::remove_file(dir.path().join("lowmod.csv")).unwrap();

    let err = run_tract_ingestion(&store(), dir.path(), &IngestConfig::default_test(), false)
        .unwrap_err();
    assert!(matches!(err, ScoreError::MissingSource { ref field, .. } if field == fields::LOWMOD_HH));
}

/// Stage 2 rescoring with the five-component formula and LILA bonus.
/// The desert's stored supply of 0.0 is re-defaulted to 0.5.
#[test]
fn dataset_stage_rescores_stored_tracts() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    write_dataset_exports(dir.path());
    let config = IngestConfig::default_test();
    let store = store();

    run_tract_ingestion(&store, dir.path(), &config, false).unwrap();
    let summary = run_dataset_enrichment(&store, dir.path(), &config, false).unwrap();

    assert_eq!(summary.kind, RunKind::Datasets);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.skipped, 0);

    let desert = store.require_tract(DESERT).unwrap();
    // 0.35×0.3 + 0.2×1 + 0.15×0.6522 + 0.2×0.5 + 0.1×0.5 + 0.15
    assert_eq!(desert.food_risk_score, 0.7028);
    assert_eq!(desert.equity_score, 0.2972);
    assert_eq!(desert.raw.p_fi_rate, Some(30.0));
    let components = desert.equity_components.unwrap();
    assert_eq!(components.need, 0.3);
    assert_eq!(components.income_gap, 1.0);
    assert_eq!(components.food_burden, 0.6522);
    assert_eq!(components.access, 0.5);
    assert_eq!(components.resource, 0.5);
    // Stage 1 fields the enrichment does not own are preserved.
    assert_eq!(desert.transit_coverage, 1.0);
    assert_eq!(desert.population, 18_000);

    let affluent = store.require_tract(AFFLUENT).unwrap();
    assert_eq!(affluent.food_risk_score, 0.0415);
    assert_eq!(affluent.equity_score, 0.9585);

    // An enrichment row with no stored tract creates nothing.
    assert!(store.get_tract("25025000999").unwrap().is_none());

    let stats = store.city_stats().unwrap().unwrap();
    assert_eq!(stats.total_tracts, 2);
    assert_eq!(stats.high_risk_tracts, 0, "0.7028 is under the 0.75 city threshold");
    assert!((stats.equity_score - 0.6278).abs() < 1e-3);

    assert_eq!(store.ingest_run_count().unwrap(), 2);
    let latest = store.latest_ingest_run().unwrap().unwrap();
    assert_eq!(latest.run_id, summary.run_id);
}

/// Stage 2 tolerates missing exports and falls back per field.
#[test]
fn dataset_stage_skips_missing_exports() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    let config = IngestConfig::default_test();
    let store = store();

    run_tract_ingestion(&store, dir.path(), &config, false).unwrap();
    let summary = run_dataset_enrichment(&store, dir.path(), &config, true).unwrap();

    assert_eq!(summary.scored, 2);
    let sample = summary.sample.unwrap();
    assert!(sample.equity_components.is_some());
    // Dry: stored document still carries the proxy score.
    assert_eq!(store.require_tract(DESERT).unwrap().equity_components, None);
}

/// Enrichment without any stored tracts rescores nothing.
#[test]
fn dataset_stage_on_empty_store_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    write_tract_exports(dir.path());
    write_dataset_exports(dir.path());
    let store = store();

    let summary =
        run_dataset_enrichment(&store, dir.path(), &IngestConfig::default_test(), false).unwrap();
    assert_eq!(summary.scored, 0);
    assert_eq!(store.tract_count().unwrap(), 0);
    assert_eq!(store.ingest_run_count().unwrap(), 0);
}

#[test]
fn ingest_tracts_is_pure() {
    let config = IngestConfig::default_test();
    let tables = [
        SourceTable::single_field(fields::MHHINC, [(DESERT, "$23,000")]),
        SourceTable::single_field(fields::RPOPDEN, [(DESERT, "40000"), (PARK, "")]),
    ];
    let ingest = ingest_tracts(&tables, &config);
    assert_eq!(ingest.records.len(), 1);
    assert_eq!(ingest.records[0].tract_id, DESERT);
    assert_eq!(ingest.report.skipped, 1);
}

/// Tracts absent from every enrichment table are still rescored from
/// fallbacks, a missing LILA cell means no designation, and non-positive
/// stored supply or transit scores fall back to 0.5.
#[test]
fn enrichment_rescores_every_tract_from_fallbacks() {
    let config = IngestConfig::default_test();
    let mut flagged = tract("25025000101", 4_000, 0.6, 0.4, 0.5);
    flagged.lila_flag = true;
    let mut bare = tract("25025000201", 4_000, 0.6, 0.4, 0.0);
    bare.supply_score = 0.0;

    let tables = [SourceTable::single_field(fields::P_FI_RATE, [("25025000101", "0.2")])];
    let enrichment = enrich_with_datasets(&[flagged, bare], &tables, &config);

    assert_eq!(enrichment.unmatched, 1);
    assert_eq!(enrichment.records.len(), 2);
    assert_eq!(enrichment.income_min, 20_000.0);
    assert_eq!(enrichment.income_max, 120_000.0);

    let matched = &enrichment.records[0];
    assert!(!matched.lila_flag, "no LILA cell means no designation");
    // 0.35×0.2 + 0.2×0.6 + 0.15×(1/3) + 0.2×0.25 + 0.1×0.5
    assert_eq!(matched.food_risk_score, 0.34);
    assert_eq!(matched.equity_score, 0.66);

    let unmatched = &enrichment.records[1];
    assert_eq!(unmatched.tract_id, "25025000201");
    // 0.35×0.15 + 0.2×0.6 + 0.15×(1/3) + 0.2×0.25 + 0.1×0.5
    assert_eq!(unmatched.food_risk_score, 0.3225);
    assert_eq!(unmatched.equity_score, 0.6775);
    let components = unmatched.equity_components.unwrap();
    assert_eq!(components.resource, 0.5);
    assert_eq!(components.access, 0.25);
    assert_eq!(unmatched.raw.p_fi_rate, Some(0.15));
    assert_eq!(unmatched.raw.mhhinc, 60_000.0);
    assert_eq!(unmatched.raw.food_avg, 8_000.0);
}

/// With no enrichment export on disk at all, nothing is rescored or written.
#[test]
fn dataset_stage_without_any_exports_writes_nothing() {
    let tract_dir = tempfile::tempdir().unwrap();
    let empty_dir = tempfile::tempdir().unwrap();
    write_tract_exports(tract_dir.path());
    let config = IngestConfig::default_test();
    let store = store();

    run_tract_ingestion(&store, tract_dir.path(), &config, false).unwrap();
    let summary = run_dataset_enrichment(&store, empty_dir.path(), &config, false).unwrap();

    assert_eq!(summary.scored, 0);
    assert_eq!(store.require_tract(DESERT).unwrap().equity_components, None);
    assert_eq!(store.ingest_run_count().unwrap(), 1);
}
