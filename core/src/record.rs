//! Per-tract records flowing through the pipeline.
//!
//! `RawIndicatorRecord` is transient: built once per ingestion run by the
//! merger and never persisted. `TractScoreRecord` is the persisted
//! document; only the scoring paths write it, and the simulator works on
//! a copy.

use crate::{config::FallbackConfig, source::parse_lila_flag, types::TractId};
use serde::{Deserialize, Serialize};

/// One tract's indicators merged across every source table.
/// Absent fields stay `None` here; fallbacks are applied by the scorers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIndicatorRecord {
    pub tract_id: TractId,
    pub median_income: Option<f64>,
    pub population_density: Option<f64>,
    pub food_spend: Option<f64>,
    /// Low/moderate income share, as a percentage of area median income.
    pub lowmod_pct: Option<f64>,
    pub food_insecurity_rate: Option<f64>,
    /// Low-income-low-access designation exactly as the source wrote it.
    pub lila_raw: Option<String>,
}

impl RawIndicatorRecord {
    pub fn new(tract_id: impl Into<TractId>) -> Self {
        Self {
            tract_id: tract_id.into(),
            ..Self::default()
        }
    }

    /// True when income, density and food spend are all missing.
    /// Such tracts (water, parks, institutional land) are not scored.
    pub fn primary_indicators_missing(&self) -> bool {
        self.median_income.is_none()
            && self.population_density.is_none()
            && self.food_spend.is_none()
    }

    pub fn lila_flag(&self) -> bool {
        self.lila_raw.as_deref().is_some_and(parse_lila_flag)
    }

    /// Same record with every missing numeric replaced by its fallback.
    pub fn with_fallbacks(&self, fallbacks: &FallbackConfig) -> FilledIndicators {
        FilledIndicators {
            median_income: self.median_income.unwrap_or(fallbacks.income),
            population_density: self
                .population_density
                .unwrap_or(fallbacks.population_density),
            food_spend: self.food_spend.unwrap_or(fallbacks.food_spend),
            lowmod_pct: self.lowmod_pct.unwrap_or(fallbacks.lowmod_pct),
            lila: self.lila_flag(),
        }
    }
}

/// Indicators after fallback substitution; what the proxy path consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledIndicators {
    pub median_income: f64,
    pub population_density: f64,
    pub food_spend: f64,
    pub lowmod_pct: f64,
    pub lila: bool,
}

/// Original indicator values kept on the record for re-scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub mhhinc: f64,
    pub rpopden: f64,
    pub food_avg: f64,
    pub lila: bool,
    pub lowmod_hh: f64,
    /// Food-insecurity rate from the enrichment stage, when it has run.
    #[serde(default)]
    pub p_fi_rate: Option<f64>,
}

/// Per-component breakdown of the five-component risk formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityComponents {
    pub need: f64,
    pub income_gap: f64,
    pub food_burden: f64,
    pub access: f64,
    pub resource: f64,
}

/// The persisted per-tract score document.
///
/// Every score field is in [0, 1] and rounded to 4 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractScoreRecord {
    pub tract_id: TractId,
    pub tract_name: String,
    // Sub-scores
    pub need_score: f64,
    pub supply_score: f64,
    pub transit_coverage: f64,
    pub vulnerability_index: f64,
    // Composites
    pub food_risk_score: f64,
    pub equity_score: f64,
    #[serde(default)]
    pub equity_components: Option<EquityComponents>,
    // Derived demographic proxies
    pub food_insecurity_rate: f64,
    pub poverty_rate: f64,
    pub snap_rate: f64,
    pub population: u64,
    pub lila_flag: bool,
    pub raw: Provenance,
}

impl TractScoreRecord {
    /// State + county FIPS of this tract, if the id carries one.
    pub fn county_fips(&self) -> Option<&str> {
        crate::types::county_fips(&self.tract_id)
    }
}
