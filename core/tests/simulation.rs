//! Intervention simulator: transforms, sequencing, and the result shape.

mod common;

use common::tract;
use foodgrid_core::{
    config::{fields, IngestConfig},
    error::ScoreError,
    pipeline::ingest_tracts,
    simulation::{
        apply_interventions, registry, simulate, validate_interventions, Intervention,
    },
    source::SourceTable,
};

/// 28 400 residents at risk 0.5: one pantry reaches 12% and trims risk
/// by 0.08 × 0.5.
#[test]
fn add_pantry_reference_case() {
    let before = tract("25025000101", 28_400, 0.5, 0.5, 0.5);
    let result = simulate(&before, &["add_pantry"]);

    assert_eq!(result.after.food_risk_score, 0.46);
    assert_eq!(result.after.equity_score, 0.54);
    assert_eq!(result.households_reached, 3_408);
    assert_eq!(result.delta.food_risk_score, -0.04);
    assert_eq!(result.delta.equity_score, 0.04);
    assert_eq!(result.delta.transit_coverage, 0.0);
}

#[test]
fn add_mobile_helps_most_where_transit_is_poor() {
    let before = tract("25025000101", 10_000, 0.5, 0.5, 0.4);
    let after = apply_interventions(&before, &["add_mobile"]);

    assert_eq!(after.record.food_risk_score, 0.47);
    assert_eq!(after.record.transit_coverage, 0.46);
    assert_eq!(after.households_reached, 700);

    let well_served = tract("25025000201", 10_000, 0.5, 0.5, 1.0);
    let after = apply_interventions(&well_served, &["add_mobile"]);
    assert_eq!(after.record.food_risk_score, 0.5);
    assert_eq!(after.record.transit_coverage, 1.0, "coverage stays clamped");
}

/// Steps apply in order and each step's reach is summed.
#[test]
fn sequence_applies_in_order() {
    let before = tract("25025000101", 10_000, 0.5, 0.5, 0.4);
    let after = apply_interventions(&before, &["add_pantry", "add_mobile", "extend_hours"]);

    assert_eq!(after.record.food_risk_score, 0.4);
    assert_eq!(after.record.equity_score, 0.56);
    assert_eq!(after.record.transit_coverage, 0.46);
    assert_eq!(after.households_reached, 1_200 + 700 + 400);
}

#[test]
fn scores_clamp_at_bounds() {
    let before = tract("25025000101", 5_000, 0.01, 0.99, 0.5);
    let after = apply_interventions(&before, &["extend_hours", "add_pantry"]);

    assert_eq!(after.record.food_risk_score, 0.0);
    assert_eq!(after.record.equity_score, 1.0);
}

/// No interventions: identical record, nobody reached.
#[test]
fn empty_list_is_identity() {
    let before = tract("25025000101", 28_400, 0.63, 0.41, 0.35);
    let after = apply_interventions::<&str>(&before, &[]);

    assert_eq!(after.record, before);
    assert_eq!(after.households_reached, 0);
}

/// Unknown names are skipped, not applied and not fatal.
#[test]
fn unknown_names_are_skipped() {
    let before = tract("25025000101", 28_400, 0.5, 0.5, 0.5);

    let only_unknown = apply_interventions(&before, &["teleport"]);
    assert_eq!(only_unknown.record, before);
    assert_eq!(only_unknown.households_reached, 0);

    let mixed = simulate(&before, &["add_pantry", "teleport"]);
    let known = simulate(&before, &["add_pantry"]);
    assert_eq!(mixed.after, known.after);
    assert_eq!(mixed.households_reached, known.households_reached);
    assert_eq!(mixed.interventions, ["add_pantry", "teleport"]);
}

#[test]
fn population_is_never_changed() {
    let before = tract("25025000101", 12_345, 0.7, 0.3, 0.2);
    let names = ["add_mobile", "add_pantry", "add_pantry", "extend_hours", "add_mobile"];
    let after = apply_interventions(&before, &names);
    assert_eq!(after.record.population, 12_345);
}

/// The input record is untouched by simulation.
#[test]
fn input_is_not_mutated() {
    let before = tract("25025000101", 8_000, 0.6, 0.4, 0.3);
    let copy = before.clone();
    let _ = simulate(&before, &["add_pantry", "extend_hours"]);
    assert_eq!(before, copy);
}

#[test]
fn validation_lists_every_unknown_name() {
    let err = validate_interventions(&["add_pantry", "teleport", "warp"]).unwrap_err();
    match &err {
        ScoreError::UnknownInterventions { names } => assert_eq!(names, &["teleport", "warp"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.to_string(), "Unknown intervention(s): teleport, warp");

    let parsed = validate_interventions(&["extend_hours", "add_pantry"]).unwrap();
    assert_eq!(parsed, [Intervention::ExtendHours, Intervention::AddPantry]);
}

#[test]
fn registry_holds_the_closed_set() {
    assert_eq!(registry().names(), ["add_mobile", "add_pantry", "extend_hours"]);
    for iv in Intervention::ALL {
        assert_eq!(Intervention::from_name(iv.name()), Some(iv));
        assert!(registry().contains(iv.name()));
    }
    assert!(registry().get("teleport").is_none());
    assert_eq!(Intervention::AddMobile.reach_fraction(), 0.07);
}

/// Wire shape of the result: before / after / delta blocks plus reach.
#[test]
fn result_serializes_to_expected_shape() {
    let before = tract("25025000101", 28_400, 0.5, 0.5, 0.5);
    let result = simulate(&before, &["add_pantry"]);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["tract_id"], "25025000101");
    assert_eq!(json["tract_name"], "Census Tract 1.01");
    assert_eq!(json["interventions"], serde_json::json!(["add_pantry"]));
    assert_eq!(json["before"]["food_risk_score"], 0.5);
    assert_eq!(json["after"]["food_risk_score"], 0.46);
    assert_eq!(json["after"]["snap_rate"], 0.2343);
    assert_eq!(json["delta"]["equity_score"], 0.04);
    assert_eq!(json["households_reached"], 3_408);
    assert!(json["delta"].get("poverty_rate").is_none());
}

/// A huge density cell yields a huge population; reach must not overflow.
#[test]
fn extreme_population_from_density_does_not_overflow() {
    let tables = [SourceTable::single_field(fields::RPOPDEN, [("25025000101", "1e19")])];
    let ingest = ingest_tracts(&tables, &IngestConfig::default_test());
    let record = &ingest.records[0];
    let population = u128::from(record.population);
    assert!(population > 1_000_000_000_000_000_000);

    let after = apply_interventions(record, &["add_pantry", "add_mobile", "extend_hours"]);

    let expected = population * 120 / 1000 + population * 70 / 1000 + population * 40 / 1000;
    assert_eq!(u128::from(after.households_reached), expected);
    assert_eq!(after.record.population, record.population);
}

/// The running total saturates instead of wrapping.
#[test]
fn households_total_saturates() {
    let before = tract("25025000101", u64::MAX, 0.5, 0.5, 0.5);
    let names = ["add_pantry"; 10];
    let after = apply_interventions(&before, &names);
    assert_eq!(after.households_reached, u64::MAX);
    assert_eq!(after.record.population, u64::MAX);
}
