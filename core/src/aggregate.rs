//! City-wide and county-level aggregates over persisted tract scores.
//!
//! RULE: aggregates are recomputed wholesale from the complete record
//! set. Callers must pass every current tract, never a delta.

use crate::{
    config::AggregateConfig,
    normalize::{round4, round_to},
    record::TractScoreRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// City summary counts tracts with food_risk_score strictly above this.
pub const CITY_HIGH_RISK_THRESHOLD: f64 = 0.75;
/// County roll-up counts tracts with food_risk_score at or above this.
pub const COUNTY_HIGH_RISK_THRESHOLD: f64 = 0.7;

/// The singleton city summary document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityStats {
    pub equity_score: f64,
    pub transit_coverage: f64,
    pub high_risk_tracts: u64,
    pub total_tracts: u64,
}

pub fn recompute_city_stats(records: &[TractScoreRecord]) -> CityStats {
    recompute_city_stats_with_threshold(records, CITY_HIGH_RISK_THRESHOLD)
}

/// Means of equity and transit coverage plus the high-risk count.
/// An empty input yields the all-zero summary.
pub fn recompute_city_stats_with_threshold(
    records: &[TractScoreRecord],
    high_risk_threshold: f64,
) -> CityStats {
    if records.is_empty() {
        return CityStats::default();
    }

    let n = records.len() as f64;
    let equity_sum: f64 = records.iter().map(|r| r.equity_score).sum();
    let transit_sum: f64 = records.iter().map(|r| r.transit_coverage).sum();
    let high_risk = records
        .iter()
        .filter(|r| r.food_risk_score > high_risk_threshold)
        .count();

    CityStats {
        equity_score: round4(equity_sum / n),
        transit_coverage: round4(transit_sum / n),
        high_risk_tracts: high_risk as u64,
        total_tracts: records.len() as u64,
    }
}

// ── County roll-up ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyScore {
    pub county_fips: String,
    pub county_name: String,
    pub tract_count: u64,
    pub avg_equity_score: f64,
    pub avg_food_risk: f64,
    pub high_risk_count: u64,
    pub lila_count: u64,
    pub avg_mhhinc: f64,
    pub avg_transit_coverage: f64,
}

#[derive(Default)]
struct CountyAccumulator {
    tracts: u64,
    equity: f64,
    risk: f64,
    high_risk: u64,
    lila: u64,
    income: f64,
    transit: f64,
}

/// Group tracts by county FIPS and average within each group.
///
/// Tracts whose id carries no county prefix fall into the configured
/// default county. Output is sorted by FIPS.
pub fn county_scores(records: &[TractScoreRecord], config: &AggregateConfig) -> Vec<CountyScore> {
    let mut groups: BTreeMap<String, CountyAccumulator> = BTreeMap::new();

    for record in records {
        let fips = record
            .county_fips()
            .unwrap_or(config.default_county_fips.as_str())
            .to_string();
        let acc = groups.entry(fips).or_default();
        acc.tracts += 1;
        acc.equity += record.equity_score;
        acc.risk += record.food_risk_score;
        if record.food_risk_score >= config.county_high_risk_threshold {
            acc.high_risk += 1;
        }
        if record.lila_flag {
            acc.lila += 1;
        }
        acc.income += record.raw.mhhinc;
        acc.transit += record.transit_coverage;
    }

    groups
        .into_iter()
        .map(|(fips, acc)| {
            let n = acc.tracts as f64;
            let county_name = config
                .county_names
                .get(&fips)
                .cloned()
                .unwrap_or_else(|| format!("County {fips}"));
            CountyScore {
                county_name,
                tract_count: acc.tracts,
                avg_equity_score: round_to(acc.equity / n, 3),
                avg_food_risk: round_to(acc.risk / n, 3),
                high_risk_count: acc.high_risk,
                lila_count: acc.lila,
                avg_mhhinc: round_to(acc.income / n, 0),
                avg_transit_coverage: round_to(acc.transit / n, 3),
                county_fips: fips,
            }
        })
        .collect()
}
