//! Transit reference data and travel-time estimates.
//!
//! Stop coordinates are loaded lazily from a JSON array on first use and
//! cached read-only for the life of the cache. A missing file caches an
//! empty stop set; every estimate has a defined fallback for that case.
//!
//! RULE: initialization runs exactly once per cache, even under
//! concurrent first access. There is no invalidation.

use crate::normalize::{round4, round_to};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, OnceLock};

/// Earth's mean radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Returned by `nearest_stop_distance_m` when no stop data exists.
pub const NO_STOP_DISTANCE_M: f64 = 999_999.0;
/// Coverage assumed when no stop data exists.
pub const NEUTRAL_COVERAGE: f64 = 0.5;
/// Stop count at which coverage saturates.
const STOPS_FOR_FULL_COVERAGE: f64 = 5.0;

const WALK_M_PER_MIN: f64 = 80.0;
const WAIT_MIN: f64 = 7.0;
const VEHICLE_M_PER_MIN: f64 = 400.0;
const EGRESS_WALK_MIN: f64 = 5.0;
const MAX_TRIP_MIN: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStop {
    #[serde(default)]
    pub stop_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Lazily loaded, read-only stop set backed by a file.
pub struct StopCache {
    path: PathBuf,
    stops: OnceLock<Vec<TransitStop>>,
}

impl StopCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stops: OnceLock::new(),
        }
    }

    /// Cache pre-filled with `stops`; never touches the filesystem.
    pub fn from_stops(stops: Vec<TransitStop>) -> Self {
        let cache = Self::new(PathBuf::new());
        let _ = cache.stops.set(stops);
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.stops.get().is_some()
    }

    /// Stops, loading them on first call.
    pub fn stops(&self) -> &[TransitStop] {
        self.stops.get_or_init(|| load_stops(&self.path))
    }

    pub fn nearest_stop_distance_m(&self, lat: f64, lon: f64) -> f64 {
        self.stops()
            .iter()
            .map(|s| haversine_m(lat, lon, s.lat, s.lon))
            .min_by(f64::total_cmp)
            .unwrap_or(NO_STOP_DISTANCE_M)
    }

    /// Rough door-to-door minutes: walk to the nearest stop, wait, ride
    /// the straight-line distance, walk from the far stop. Capped at 90.
    pub fn estimate_transit_minutes(
        &self,
        from_lat: f64,
        from_lon: f64,
        to_lat: f64,
        to_lon: f64,
    ) -> f64 {
        let walk_to_stop = self.nearest_stop_distance_m(from_lat, from_lon) / WALK_M_PER_MIN;
        let in_vehicle = haversine_m(from_lat, from_lon, to_lat, to_lon) / VEHICLE_M_PER_MIN;
        let total = walk_to_stop + WAIT_MIN + in_vehicle + EGRESS_WALK_MIN;
        round_to(total.min(MAX_TRIP_MIN), 1)
    }

    /// Stops within `radius_m` of a tract centroid, mapped so that
    /// 0 stops -> 0.0 and 5+ stops -> 1.0.
    pub fn transit_coverage_score(&self, centroid_lat: f64, centroid_lon: f64, radius_m: f64) -> f64 {
        let stops = self.stops();
        if stops.is_empty() {
            return NEUTRAL_COVERAGE;
        }
        let in_range = stops
            .iter()
            .filter(|s| haversine_m(centroid_lat, centroid_lon, s.lat, s.lon) <= radius_m)
            .count();
        round4((in_range as f64 / STOPS_FOR_FULL_COVERAGE).min(1.0))
    }
}

fn load_stops(path: &Path) -> Vec<TransitStop> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            log::info!("no transit stop data at {}; using empty set", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<TransitStop>>(&content) {
        Ok(stops) => {
            log::info!("loaded {} transit stops from {}", stops.len(), path.display());
            stops
        }
        Err(e) => {
            log::warn!("cannot parse {}: {e}; using empty set", path.display());
            Vec::new()
        }
    }
}

/// Process-wide cache. The path comes from `FOODGRID_TRANSIT_STOPS`,
/// else `data/transit_stops.json`, resolved on first access.
static DEFAULT_CACHE: LazyLock<StopCache> = LazyLock::new(|| {
    let path = std::env::var("FOODGRID_TRANSIT_STOPS")
        .unwrap_or_else(|_| "data/transit_stops.json".to_string());
    StopCache::new(path)
});

pub fn default_cache() -> &'static StopCache {
    &DEFAULT_CACHE
}

/// Great-circle distance in metres between two WGS-84 points.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lam = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lam / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}
