//! score-runner: headless driver for the food access scoring core.
//!
//! Usage:
//!   score-runner ingest-tracts   --data-dir DIR --db FILE [--dry-run]
//!   score-runner ingest-datasets --data-dir DIR --db FILE [--dry-run]
//!   score-runner stats    --db FILE
//!   score-runner counties --db FILE
//!   score-runner simulate --db FILE --tract GEOID --interventions add_pantry,add_mobile
//!   score-runner transit  [--data-dir DIR] --lat LAT --lon LON [--to-lat LAT --to-lon LON]
//!
//! Without --data-dir, `transit` uses the process-wide stop cache
//! (FOODGRID_TRANSIT_STOPS, else data/transit_stops.json).

use anyhow::{bail, Result};
use foodgrid_core::{
    aggregate::county_scores,
    config::IngestConfig,
    pipeline::{self, RunSummary},
    simulation::{simulate, validate_interventions},
    store::ScoreStore,
    transit::{default_cache, StopCache},
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir_flag = flag_value(&args, "--data-dir");
    let data_dir = data_dir_flag.unwrap_or("./data");
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let config = IngestConfig::load(data_dir)?;
    let store = ScoreStore::open(db)?;
    store.migrate()?;

    match command {
        "ingest-tracts" => {
            println!("Loading tract tables from: {data_dir}");
            let summary =
                pipeline::run_tract_ingestion(&store, Path::new(data_dir), &config, dry_run)?;
            print_run_summary(&summary);
        }
        "ingest-datasets" => {
            println!("Loading enrichment datasets from: {data_dir}");
            let summary =
                pipeline::run_dataset_enrichment(&store, Path::new(data_dir), &config, dry_run)?;
            print_run_summary(&summary);
        }
        "stats" => {
            let stats = match store.city_stats()? {
                Some(stats) => stats,
                None => {
                    log::warn!("city stats not found; computing from stored tracts");
                    pipeline::recompute_stored_city_stats(&store, &config)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "counties" => {
            let tracts = store.all_tracts()?;
            let counties = county_scores(&tracts, &config.aggregate);
            println!("{}", serde_json::to_string_pretty(&counties)?);
        }
        "simulate" => {
            let Some(tract_id) = flag_value(&args, "--tract") else {
                bail!("simulate requires --tract GEOID");
            };
            let names: Vec<String> = flag_value(&args, "--interventions")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                bail!("simulate requires at least one intervention");
            }
            validate_interventions(&names)?;

            let tract = store.require_tract(tract_id)?;
            let result = simulate(&tract, &names);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "transit" => {
            let lat = parse_arg(&args, "--lat", f64::NAN);
            let lon = parse_arg(&args, "--lon", f64::NAN);
            if lat.is_nan() || lon.is_nan() {
                bail!("transit requires --lat and --lon");
            }
            let local;
            let cache = match data_dir_flag {
                Some(dir) => {
                    local = StopCache::new(Path::new(dir).join(&config.transit.stops_file));
                    &local
                }
                None => default_cache(),
            };
            println!("  stops loaded:     {}", cache.stops().len());
            println!("  nearest stop:     {:.0} m", cache.nearest_stop_distance_m(lat, lon));
            println!(
                "  coverage score:   {:.4}",
                cache.transit_coverage_score(lat, lon, config.transit.walk_shed_radius_m)
            );
            let to_lat = parse_arg(&args, "--to-lat", f64::NAN);
            let to_lon = parse_arg(&args, "--to-lon", f64::NAN);
            if !to_lat.is_nan() && !to_lon.is_nan() {
                println!(
                    "  est. trip:        {:.1} min",
                    cache.estimate_transit_minutes(lat, lon, to_lat, to_lon)
                );
            }
        }
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    let mode = if summary.dry_run { "[DRY RUN] " } else { "" };
    println!("=== {mode}INGEST SUMMARY ===");
    println!("  run_id:          {}", summary.run_id);
    println!("  kind:            {}", summary.kind.name());
    println!("  ids seen:        {}", summary.report.total_ids);
    println!("  scored:          {}", summary.scored);
    println!("  skipped:         {}", summary.skipped);
    println!("  invalid ids:     {}", summary.report.invalid_ids);
    println!("  malformed cells: {}", summary.report.malformed_cells);

    if let Some(stats) = &summary.city_stats {
        println!();
        println!("=== CITY STATS ===");
        println!("  equity:          {:.4}", stats.equity_score);
        println!("  transit:         {:.4}", stats.transit_coverage);
        println!("  high risk:       {}", stats.high_risk_tracts);
        println!("  total tracts:    {}", stats.total_tracts);
    }

    if summary.dry_run {
        if let Some(sample) = &summary.sample {
            println!();
            println!(
                "  sample: {} ({}) risk={:.4} equity={:.4}",
                sample.tract_id, sample.tract_name, sample.food_risk_score, sample.equity_score
            );
        }
    }
}

fn print_usage() {
    println!("score-runner: food access risk scoring");
    println!();
    println!("  ingest-tracts   --data-dir DIR --db FILE [--dry-run]");
    println!("  ingest-datasets --data-dir DIR --db FILE [--dry-run]");
    println!("  stats           --db FILE");
    println!("  counties        --db FILE");
    println!("  simulate        --db FILE --tract GEOID --interventions a,b");
    println!("  transit         [--data-dir DIR] --lat LAT --lon LON [--to-lat LAT --to-lon LON]");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
