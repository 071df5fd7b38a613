//! Ingestion and scoring configuration.
//!
//! Formula weights are fixed constants in `scoring.rs` and are NOT
//! configurable. This file only carries where the source tables live,
//! the fallback constants for missing inputs, the proxy normalisation
//! anchors, and the aggregation thresholds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Source tables ──────────────────────────────────────────────────

/// Technical field names of the source tables.
pub mod fields {
    pub const MHHINC: &str = "mhhinc";
    pub const RPOPDEN: &str = "rpopden";
    pub const FOOD_AVG: &str = "food_avg";
    pub const LILA: &str = "lilatracts_all";
    pub const LOWMOD_HH: &str = "lowmod_hh";
    pub const P_FI_RATE: &str = "p_fi_rate";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Column holding the tract GeoID in every table.
    pub id_column: String,
    /// Tables read by the tract ingestion stage: field -> file name.
    pub tract_tables: BTreeMap<String, String>,
    /// Tables read by the enrichment stage: field -> file name.
    pub dataset_tables: BTreeMap<String, String>,
}

// ── Fallbacks ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub income: f64,
    pub population_density: f64,
    pub food_spend: f64,
    /// Low/moderate income share; 80 means "at area median income".
    pub lowmod_pct: f64,
    // Enrichment-stage defaults.
    pub food_insecurity_rate: f64,
    pub enrichment_food_spend: f64,
    pub supply_score: f64,
    pub transit_coverage: f64,
    pub income_min: f64,
    pub income_max: f64,
}

// ── Proxy anchors ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAnchors {
    pub income_low: f64,
    pub income_high: f64,
    pub food_spend_low: f64,
    pub food_spend_high: f64,
    /// People per square mile at which transit coverage saturates.
    pub density_transit_cutoff: f64,
    /// County-average SNAP rate used when no tract-level rate exists.
    pub county_snap_rate: f64,
    /// Average tract area in square miles, for the population estimate.
    pub tract_area_sq_mi: f64,
}

// ── Aggregation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// City summary counts tracts with food_risk_score strictly above this.
    pub city_high_risk_threshold: f64,
    /// County roll-up counts tracts with food_risk_score at or above this.
    pub county_high_risk_threshold: f64,
    pub default_county_fips: String,
    pub county_names: BTreeMap<String, String>,
}

// ── Transit reference data ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitConfig {
    /// Relative to the data directory.
    pub stops_file: String,
    pub walk_shed_radius_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub sources: SourceConfig,
    pub fallbacks: FallbackConfig,
    pub anchors: ProxyAnchors,
    pub aggregate: AggregateConfig,
    pub transit: TransitConfig,
}

impl IngestConfig {
    /// Load from `<data_dir>/ingest.json`. A missing file yields the
    /// built-in defaults; a malformed one is an error.
    /// In tests, use IngestConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/ingest.json");
        if !std::path::Path::new(&path).exists() {
            log::info!("no {path}; using built-in ingest defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: IngestConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Built-in configuration with short, predictable table file names.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.sources.tract_tables = [
            (fields::FOOD_AVG, "food_avg.csv"),
            (fields::LILA, "lila.csv"),
            (fields::LOWMOD_HH, "lowmod.csv"),
            (fields::MHHINC, "mhhinc.csv"),
            (fields::RPOPDEN, "popden.csv"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        config.sources.dataset_tables = [
            (fields::MHHINC, "mhhinc.csv"),
            (fields::P_FI_RATE, "p_fi_rate.csv"),
            (fields::FOOD_AVG, "food_avg.csv"),
            (fields::LILA, "lila_flag.csv"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        config
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        let tract_tables = [
            (fields::FOOD_AVG, "PolicyMap Data Amount Spent per Household on Food.csv"),
            (fields::LILA, "PolicyMap Data Low Income + Low Access flag (USDA LILA).csv"),
            (fields::LOWMOD_HH, "PolicyMap Data Median Household Income %.csv"),
            (fields::MHHINC, "PolicyMap Data Median Household Income (raw $).csv"),
            (fields::RPOPDEN, "PolicyMap Data Population Density.csv"),
        ];
        let dataset_tables = [
            (fields::MHHINC, "PolicyMap Data 2026-02-21 230612 UTC.csv"),
            (fields::P_FI_RATE, "PolicyMap Data 2026-02-21 224444 UTC.csv"),
            (fields::FOOD_AVG, "PolicyMap Data 2026-02-21 230737 UTC.csv"),
            (fields::LILA, "PolicyMap Data 2026-02-21 231057 UTC.csv"),
        ];

        Self {
            sources: SourceConfig {
                id_column: "GeoID".into(),
                tract_tables: tract_tables
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                dataset_tables: dataset_tables
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            fallbacks: FallbackConfig {
                income: 60_000.0,
                population_density: 15_000.0,
                food_spend: 10_000.0,
                lowmod_pct: 80.0,
                food_insecurity_rate: 0.15,
                enrichment_food_spend: 8_000.0,
                supply_score: 0.5,
                transit_coverage: 0.5,
                income_min: 20_000.0,
                income_max: 120_000.0,
            },
            anchors: ProxyAnchors {
                income_low: 23_000.0,
                income_high: 250_000.0,
                food_spend_low: 6_000.0,
                food_spend_high: 16_000.0,
                density_transit_cutoff: 40_000.0,
                county_snap_rate: 0.2343,
                tract_area_sq_mi: 0.45,
            },
            aggregate: AggregateConfig {
                city_high_risk_threshold: 0.75,
                county_high_risk_threshold: 0.7,
                default_county_fips: "25025".into(),
                county_names: [("25025".to_string(), "Suffolk County".to_string())].into(),
            },
            transit: TransitConfig {
                stops_file: "transit_stops.json".into(),
                walk_shed_radius_m: 800.0,
            },
        }
    }
}
