//! Food access risk scoring for census tracts.
//!
//! Source tables are merged per tract, normalised, and combined into
//! composite risk and equity scores; city and county aggregates are
//! recomputed from the stored set; a what-if simulator applies named
//! policy interventions to one tract's scores.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod scoring;
pub mod simulation;
pub mod source;
pub mod store;
pub mod transit;
pub mod types;
