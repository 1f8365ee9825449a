//! Smart-charging simulator entry point: CLI wiring, batch runs and export.

use std::fs;
use std::process;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smart_charging_sim::cli::Cli;
use smart_charging_sim::io::export::{export_csv, export_json, export_trace_csv};
use smart_charging_sim::reporting::{print_average, print_comparisons, print_runs};
use smart_charging_sim::runner::{compare, run_all};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let scenario = cli.scenario_config().unwrap_or_else(|e| fail(e));

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let profiles = scenario.load_profiles().unwrap_or_else(|e| fail(e));

    // Run every policy batch
    let results = run_all(&scenario, &profiles).unwrap_or_else(|e| fail(e));

    for batch in &results {
        if cli.per_run {
            print_runs(batch);
        }
        print_average(batch);
    }

    if results.len() > 1 {
        match compare(&results, cli.alpha) {
            Ok(cmps) => print_comparisons(&cmps, cli.alpha),
            Err(e) => warn!(error = %e, "skipping policy comparison"),
        }
    }

    // Export if requested
    if let Some(path) = &cli.observations_out {
        if let Err(e) = export_csv(&results, path) {
            fail(format!("failed to write CSV: {e}"));
        }
        info!(path = %path.display(), "observations written");
    }

    if let Some(path) = &cli.json_out {
        if let Err(e) = export_json(&results, path) {
            fail(format!("failed to write JSON: {e}"));
        }
        info!(path = %path.display(), "run reports written");
    }

    if let Some(dir) = &cli.trace_dir {
        if let Err(e) = fs::create_dir_all(dir) {
            fail(format!("cannot create \"{}\": {e}", dir.display()));
        }
        for batch in &results {
            for (run, outcome) in batch.outcomes.iter().enumerate() {
                let path = dir.join(format!("trace_{}_{run}.csv", batch.policy));
                if let Err(e) = export_trace_csv(&outcome.trace, &path) {
                    fail(format!("failed to write trace: {e}"));
                }
            }
        }
        info!(dir = %dir.display(), "load traces written");
    }
}
