//! Food Risk Score engine.
//!
//! Three scoring paths, each called at a different pipeline stage:
//!
//!   1. Four-component Food Risk (weights sum to 1.0):
//!        food_risk = 0.4 × need + 0.3 × (1 − supply)
//!                  + 0.2 × (1 − transit) + 0.1 × vulnerability
//!      with the ratio equity score and the vulnerability index.
//!   2. Five-component risk with the food-desert bonus; its equity score
//!      is 1 − risk. Used once the enrichment datasets are loaded.
//!   3. Proxy path: derives need / supply / transit directly from income,
//!      food spend, density and the LILA flag, then feeds path 1. Used at
//!      raw tract ingestion.
//!
//! The three equity definitions are NOT interchangeable and are kept as
//! separate functions.
//!
//! Everything here is pure: no I/O, no shared state. Higher risk means
//! worse food access.

use crate::{
    config::IngestConfig,
    normalize::{clamp_unit, normalize, round4},
    record::{EquityComponents, Provenance, RawIndicatorRecord, TractScoreRecord},
    types::tract_name,
};
use serde::{Deserialize, Serialize};

// ── Path 1: four-component Food Risk ───────────────────────────────

pub const NEED_WEIGHT: f64 = 0.4;
pub const SUPPLY_WEIGHT: f64 = 0.3;
pub const TRANSIT_WEIGHT: f64 = 0.2;
pub const VULNERABILITY_WEIGHT: f64 = 0.1;

/// Canonical four-component Food Risk Score, clamped and rounded.
///
/// Supply and transit are inverted so that good coverage lowers risk.
pub fn compute_food_risk_score(
    need_score: f64,
    supply_score: f64,
    transit_score: f64,
    vulnerability_index: f64,
) -> f64 {
    let raw = NEED_WEIGHT * need_score
        + SUPPLY_WEIGHT * (1.0 - supply_score)
        + TRANSIT_WEIGHT * (1.0 - transit_score)
        + VULNERABILITY_WEIGHT * vulnerability_index;
    round4(clamp_unit(raw))
}

/// Access parity between high-need and low-need residents.
///
/// 1.0 is perfect parity. Returns 0.0 when there is no low-need baseline.
pub fn compute_equity_score(high_need_access_rate: f64, low_need_access_rate: f64) -> f64 {
    if low_need_access_rate == 0.0 {
        return 0.0;
    }
    round4(clamp_unit(high_need_access_rate / low_need_access_rate))
}

/// Demographic inputs to the vulnerability index, each a fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityInputs {
    pub poverty_rate: f64,
    pub snap_rate: f64,
    pub pct_non_english: f64,
    pub pct_elderly: f64,
    pub pct_disabled: f64,
}

/// Composite vulnerability: poverty 35%, SNAP 25%, limited English 20%,
/// elderly 10%, disabled 10%.
pub fn compute_vulnerability_index(inputs: &VulnerabilityInputs) -> f64 {
    let raw = 0.35 * inputs.poverty_rate
        + 0.25 * inputs.snap_rate
        + 0.20 * inputs.pct_non_english
        + 0.10 * inputs.pct_elderly
        + 0.10 * inputs.pct_disabled;
    round4(clamp_unit(raw))
}

// ── Path 2: five-component risk with LILA bonus ────────────────────

/// Food-desert bonus added before the final clamp.
pub const LILA_BONUS: f64 = 0.15;
/// Food spend at 40% of income counts as full burden.
pub const FULL_BURDEN_RATIO: f64 = 0.40;
/// Burden ratio assumed when income is missing or non-positive.
pub const DEFAULT_BURDEN_RATIO: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullEquityInputs {
    /// Fraction or percentage; values above 1.0 are divided by 100.
    pub food_insecurity_rate: f64,
    pub median_income: f64,
    pub food_spend: f64,
    pub lila: bool,
    pub supply_score: f64,
    pub transit_coverage: f64,
    /// Dataset-wide income range used to normalise `median_income`.
    pub income_min: f64,
    pub income_max: f64,
}

impl Default for FullEquityInputs {
    fn default() -> Self {
        Self {
            food_insecurity_rate: 0.15,
            median_income: 60_000.0,
            food_spend: 8_000.0,
            lila: false,
            supply_score: 0.5,
            transit_coverage: 0.5,
            income_min: 20_000.0,
            income_max: 120_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullEquityScore {
    pub food_risk_score: f64,
    pub equity_score: f64,
    pub need_score: f64,
    /// Mean of income gap and food burden.
    pub vulnerability_index: f64,
    pub supply_score: f64,
    pub components: EquityComponents,
}

/// Five-component risk: need 35%, income gap 20%, food burden 15%,
/// access 20%, resource 10%, plus `LILA_BONUS` for flagged tracts.
pub fn compute_full_equity_score(inputs: &FullEquityInputs) -> FullEquityScore {
    let mut fi_rate = inputs.food_insecurity_rate;
    if fi_rate > 1.0 {
        fi_rate /= 100.0;
    }
    let need = clamp_unit(fi_rate);

    let income_gap =
        clamp_unit(1.0 - normalize(inputs.median_income, inputs.income_min, inputs.income_max));

    let burden_ratio = if inputs.median_income > 0.0 {
        inputs.food_spend / inputs.median_income
    } else {
        DEFAULT_BURDEN_RATIO
    };
    let food_burden = clamp_unit(burden_ratio / FULL_BURDEN_RATIO);

    let lila = if inputs.lila { 1.0 } else { 0.0 };
    let access = clamp_unit(0.5 * lila + 0.5 * (1.0 - inputs.transit_coverage));

    let resource = clamp_unit(1.0 - inputs.supply_score);

    let mut raw_risk = 0.35 * need
        + 0.20 * income_gap
        + 0.15 * food_burden
        + 0.20 * access
        + 0.10 * resource;
    if inputs.lila {
        raw_risk += LILA_BONUS;
    }

    let food_risk_score = round4(clamp_unit(raw_risk));
    let equity_score = round4(1.0 - food_risk_score);

    FullEquityScore {
        food_risk_score,
        equity_score,
        need_score: round4(need),
        vulnerability_index: round4(clamp_unit((income_gap + food_burden) / 2.0)),
        supply_score: round4(clamp_unit(inputs.supply_score)),
        components: EquityComponents {
            need: round4(need),
            income_gap: round4(income_gap),
            food_burden: round4(food_burden),
            access: round4(access),
            resource: round4(resource),
        },
    }
}

// ── Path 3: proxy scoring at raw ingestion ─────────────────────────

/// Equity proxy used before the enrichment datasets exist: the
/// high-need access rate is supply × transit against a 1.0 baseline.
pub fn compute_proxy_equity_score(supply_score: f64, transit_score: f64) -> f64 {
    compute_equity_score(clamp_unit(supply_score * transit_score), 1.0)
}

/// Sub-scores derived by the proxy path, before composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProxySubScores {
    pub income_need: f64,
    pub need_score: f64,
    pub supply_score: f64,
    pub transit_score: f64,
    /// 1 − lowmod/100: how far below area median income the tract sits.
    pub lowmod_gap: f64,
}

/// need: 60% income, 40% food spend (lower = more need).
/// supply: 0 for LILA tracts, 1 otherwise.
/// transit: density over the saturation cutoff.
pub fn proxy_sub_scores(raw: &RawIndicatorRecord, config: &IngestConfig) -> ProxySubScores {
    let filled = raw.with_fallbacks(&config.fallbacks);
    let anchors = &config.anchors;

    let income_need = clamp_unit(
        1.0 - normalize(filled.median_income, anchors.income_low, anchors.income_high),
    );
    let spend_need = clamp_unit(
        1.0 - normalize(filled.food_spend, anchors.food_spend_low, anchors.food_spend_high),
    );
    let need_score = clamp_unit(0.6 * income_need + 0.4 * spend_need);

    let lila = if filled.lila { 1.0 } else { 0.0 };
    let supply_score = 1.0 - lila;

    let transit_score = if anchors.density_transit_cutoff > 0.0 {
        clamp_unit(filled.population_density / anchors.density_transit_cutoff)
    } else {
        0.0
    };

    let lowmod_gap = clamp_unit(1.0 - filled.lowmod_pct / 100.0);

    ProxySubScores {
        income_need,
        need_score,
        supply_score,
        transit_score,
        lowmod_gap,
    }
}

/// Full proxy scoring of one merged tract into a persisted record.
pub fn derive_tract_metrics(raw: &RawIndicatorRecord, config: &IngestConfig) -> TractScoreRecord {
    let filled = raw.with_fallbacks(&config.fallbacks);
    let anchors = &config.anchors;
    let subs = proxy_sub_scores(raw, config);

    let vulnerability_index = compute_vulnerability_index(&VulnerabilityInputs {
        poverty_rate: subs.lowmod_gap,
        snap_rate: anchors.county_snap_rate,
        ..VulnerabilityInputs::default()
    });
    let food_risk_score = compute_food_risk_score(
        subs.need_score,
        subs.supply_score,
        subs.transit_score,
        vulnerability_index,
    );
    let equity_score = compute_proxy_equity_score(subs.supply_score, subs.transit_score);

    let lila = if filled.lila { 1.0 } else { 0.0 };
    let poverty_rate = clamp_unit(subs.lowmod_gap * 0.7);
    let food_insecurity_rate = clamp_unit(0.5 * subs.income_need + 0.5 * lila);
    let population = estimate_population(filled.population_density, anchors.tract_area_sq_mi);

    TractScoreRecord {
        tract_id: raw.tract_id.clone(),
        tract_name: tract_name(&raw.tract_id),
        need_score: round4(subs.need_score),
        supply_score: round4(subs.supply_score),
        transit_coverage: round4(subs.transit_score),
        vulnerability_index,
        food_risk_score,
        equity_score,
        equity_components: None,
        food_insecurity_rate: round4(food_insecurity_rate),
        poverty_rate: round4(poverty_rate),
        snap_rate: round4(anchors.county_snap_rate),
        population,
        lila_flag: filled.lila,
        raw: Provenance {
            mhhinc: filled.median_income,
            rpopden: filled.population_density,
            food_avg: filled.food_spend,
            lila: filled.lila,
            lowmod_hh: filled.lowmod_pct,
            p_fi_rate: raw.food_insecurity_rate,
        },
    }
}

/// Largest population a record can carry; fits a SQLite INTEGER.
pub const MAX_POPULATION: u64 = i64::MAX as u64;

/// Density × average tract area, in [1, MAX_POPULATION].
pub fn estimate_population(density: f64, area_sq_mi: f64) -> u64 {
    let estimate = (density * area_sq_mi).max(0.0);
    (estimate as u64).clamp(1, MAX_POPULATION)
}
