//! Policy-intervention simulator.
//!
//! RULES:
//!   - The registry is built once, on first use, and never mutated.
//!   - Every transform takes the tract by reference and returns a new
//!     record; nothing is mutated in place.
//!   - Interventions never change population.
//!   - Unknown names are skipped with a warning, never an error. Deciding
//!     whether an unknown name is a client error is `validate_interventions`'
//!     job, at the boundary.
//!
//! Each delta models one intervention at standard scale.

use crate::{
    error::{ScoreError, ScoreResult},
    normalize::{clamp_unit, round4},
    record::TractScoreRecord,
    types::TractId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    AddPantry,
    AddMobile,
    ExtendHours,
}

impl Intervention {
    pub const ALL: [Intervention; 3] = [
        Intervention::AddPantry,
        Intervention::AddMobile,
        Intervention::ExtendHours,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPantry => "add_pantry",
            Self::AddMobile => "add_mobile",
            Self::ExtendHours => "extend_hours",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|iv| iv.name() == name)
    }

    /// Share of the population reached, in thousandths.
    /// Integer so that `population × share` truncates exactly.
    pub fn reach_per_mille(&self) -> u64 {
        match self {
            Self::AddPantry => 120,
            Self::AddMobile => 70,
            Self::ExtendHours => 40,
        }
    }

    pub fn reach_fraction(&self) -> f64 {
        self.reach_per_mille() as f64 / 1000.0
    }

    fn transform(&self) -> InterventionFn {
        match self {
            Self::AddPantry => add_pantry,
            Self::AddMobile => add_mobile,
            Self::ExtendHours => extend_hours,
        }
    }

    fn households_reached(&self, tract: &TractScoreRecord) -> u64 {
        let reached = u128::from(tract.population) * u128::from(self.reach_per_mille()) / 1000;
        u64::try_from(reached).unwrap_or(u64::MAX)
    }
}

/// Result of one transform step.
#[derive(Debug, Clone, PartialEq)]
pub struct InterventionOutcome {
    pub record: TractScoreRecord,
    pub households_reached: u64,
}

pub type InterventionFn = fn(&TractScoreRecord) -> InterventionOutcome;

// ── Transforms ─────────────────────────────────────────────────────

/// New pantry. Supply is proxied by 1 − food_risk, so a pantry in a
/// well-supplied area does less marginal good.
///   food_risk −= 0.08 × (1 − supply)
///   equity    += 0.04
fn add_pantry(tract: &TractScoreRecord) -> InterventionOutcome {
    let mut out = tract.clone();
    let supply_proxy = 1.0 - out.food_risk_score;
    out.food_risk_score = clamp_unit(out.food_risk_score - 0.08 * (1.0 - supply_proxy));
    out.equity_score = clamp_unit(out.equity_score + 0.04);
    InterventionOutcome {
        households_reached: Intervention::AddPantry.households_reached(&out),
        record: out,
    }
}

/// Mobile distribution unit; helps most where transit is poor.
///   food_risk        −= 0.05 × (1 − transit_coverage)
///   transit_coverage += 0.06
fn add_mobile(tract: &TractScoreRecord) -> InterventionOutcome {
    let mut out = tract.clone();
    let transit = out.transit_coverage;
    out.food_risk_score = clamp_unit(out.food_risk_score - 0.05 * (1.0 - transit));
    out.transit_coverage = clamp_unit(transit + 0.06);
    InterventionOutcome {
        households_reached: Intervention::AddMobile.households_reached(&out),
        record: out,
    }
}

/// Extended hours at existing resources.
///   food_risk −= 0.03 (flat)
///   equity    += 0.02
fn extend_hours(tract: &TractScoreRecord) -> InterventionOutcome {
    let mut out = tract.clone();
    out.food_risk_score = clamp_unit(out.food_risk_score - 0.03);
    out.equity_score = clamp_unit(out.equity_score + 0.02);
    InterventionOutcome {
        households_reached: Intervention::ExtendHours.households_reached(&out),
        record: out,
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// Name -> transform lookup, fixed for the process lifetime.
pub struct InterventionRegistry {
    entries: HashMap<&'static str, (Intervention, InterventionFn)>,
}

impl InterventionRegistry {
    fn build() -> Self {
        let entries = Intervention::ALL
            .into_iter()
            .map(|iv| (iv.name(), (iv, iv.transform())))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<(Intervention, InterventionFn)> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

static REGISTRY: OnceLock<InterventionRegistry> = OnceLock::new();

pub fn registry() -> &'static InterventionRegistry {
    REGISTRY.get_or_init(InterventionRegistry::build)
}

/// Reject any name outside the closed intervention set.
/// Returns the parsed interventions in input order.
pub fn validate_interventions<S: AsRef<str>>(names: &[S]) -> ScoreResult<Vec<Intervention>> {
    let unknown: Vec<String> = names
        .iter()
        .map(|n| n.as_ref())
        .filter(|n| !registry().contains(n))
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        return Err(ScoreError::UnknownInterventions { names: unknown });
    }
    Ok(names
        .iter()
        .filter_map(|n| Intervention::from_name(n.as_ref()))
        .collect())
}

// ── Driver ─────────────────────────────────────────────────────────

/// A tract after a sequence of interventions.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTract {
    pub record: TractScoreRecord,
    /// Sum of every applied step's own reach estimate.
    pub households_reached: u64,
}

/// Apply the named interventions in order to a copy of `tract`.
pub fn apply_interventions<S: AsRef<str>>(tract: &TractScoreRecord, names: &[S]) -> SimulatedTract {
    let mut current = tract.clone();
    let mut total_households = 0u64;

    for name in names {
        let name = name.as_ref();
        let Some((intervention, transform)) = registry().get(name) else {
            log::warn!("unknown intervention '{name}'; skipped");
            continue;
        };
        let population = current.population;
        let outcome = transform(&current);
        total_households = total_households.saturating_add(outcome.households_reached);
        current = outcome.record;
        current.population = population;
        reclamp_scores(&mut current);
        log::debug!(
            "tract {}: {} -> risk={:.4} equity={:.4}",
            current.tract_id,
            intervention.name(),
            current.food_risk_score,
            current.equity_score
        );
    }

    SimulatedTract {
        record: current,
        households_reached: total_households,
    }
}

fn reclamp_scores(tract: &mut TractScoreRecord) {
    for score in [
        &mut tract.food_risk_score,
        &mut tract.equity_score,
        &mut tract.transit_coverage,
        &mut tract.need_score,
        &mut tract.supply_score,
        &mut tract.vulnerability_index,
    ] {
        *score = round4(clamp_unit(*score));
    }
}

// ── Before / after comparison ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub food_risk_score: f64,
    pub equity_score: f64,
    pub transit_coverage: f64,
    pub food_insecurity_rate: f64,
    pub poverty_rate: f64,
    pub snap_rate: f64,
}

impl From<&TractScoreRecord> for ScoreSnapshot {
    fn from(t: &TractScoreRecord) -> Self {
        Self {
            food_risk_score: t.food_risk_score,
            equity_score: t.equity_score,
            transit_coverage: t.transit_coverage,
            food_insecurity_rate: t.food_insecurity_rate,
            poverty_rate: t.poverty_rate,
            snap_rate: t.snap_rate,
        }
    }
}

/// After minus before. Negative risk and positive equity are improvements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub food_risk_score: f64,
    pub equity_score: f64,
    pub transit_coverage: f64,
}

/// Ephemeral simulation response; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub tract_id: TractId,
    pub tract_name: String,
    /// Echo of the requested names, in request order.
    pub interventions: Vec<String>,
    pub before: ScoreSnapshot,
    pub after: ScoreSnapshot,
    pub delta: ScoreDelta,
    pub households_reached: u64,
}

pub fn simulate<S: AsRef<str>>(tract: &TractScoreRecord, names: &[S]) -> SimulationResult {
    let before = ScoreSnapshot::from(tract);
    let simulated = apply_interventions(tract, names);
    let after = ScoreSnapshot::from(&simulated.record);

    SimulationResult {
        tract_id: tract.tract_id.clone(),
        tract_name: tract.tract_name.clone(),
        interventions: names.iter().map(|n| n.as_ref().to_string()).collect(),
        before,
        after,
        delta: ScoreDelta {
            food_risk_score: round4(after.food_risk_score - before.food_risk_score),
            equity_score: round4(after.equity_score - before.equity_score),
            transit_coverage: round4(after.transit_coverage - before.transit_coverage),
        },
        households_reached: simulated.households_reached,
    }
}
