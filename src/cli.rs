use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ScenarioConfig};
use crate::sim::policy::Policy;

/// Command-line options. Flags override values of the selected scenario.
#[derive(Parser, Debug)]
#[command(name = "smart-charging-sim", version)]
#[command(about = "Compare EV smart-charging policies on a capacity-limited parking facility", long_about = None)]
pub struct Cli {
    /// Load scenario from TOML config file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, solar_summer, solar_winter, solar_wide_summer, solar_wide_winter)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Policy to run; repeat to compare several (immediate, fcfs, elfs, price)
    #[arg(long = "policy", value_name = "POLICY")]
    pub policies: Vec<Policy>,

    /// Number of runs per policy
    #[arg(long)]
    pub runs: Option<usize>,

    /// Measured hours per run after the steady cycle
    #[arg(long)]
    pub runtime: Option<f64>,

    /// Override random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort a run on the first invariant violation
    #[arg(long)]
    pub strict: bool,

    /// Significance level of the policy comparison (0.05 or 0.01)
    #[arg(long, default_value_t = 0.05, value_parser = parse_alpha)]
    pub alpha: f64,

    /// Print the report of every run, not just averages
    #[arg(long)]
    pub per_run: bool,

    /// Export per-run observations to CSV
    #[arg(long, value_name = "PATH")]
    pub observations_out: Option<PathBuf>,

    /// Export the cable load trace of every run into this directory
    #[arg(long, value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,

    /// Export every run report to JSON
    #[arg(long, value_name = "PATH")]
    pub json_out: Option<PathBuf>,
}

fn parse_alpha(s: &str) -> Result<f64, String> {
    let alpha: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (alpha - 0.05).abs() < 1e-9 || (alpha - 0.01).abs() < 1e-9 {
        Ok(alpha)
    } else {
        Err(format!("alpha must be 0.05 or 0.01, got {alpha}"))
    }
}

impl Cli {
    /// Loads the scenario named by `--scenario` or `--preset`, falling back
    /// to the baseline, and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file or preset cannot be loaded.
    pub fn scenario_config(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = if let Some(path) = &self.scenario {
            ScenarioConfig::from_toml_file(path)?
        } else if let Some(name) = &self.preset {
            ScenarioConfig::from_preset(name)?
        } else {
            ScenarioConfig::baseline()
        };
        self.apply_overrides(&mut cfg);
        Ok(cfg)
    }

    fn apply_overrides(&self, cfg: &mut ScenarioConfig) {
        let sim = &mut cfg.simulation;
        if !self.policies.is_empty() {
            sim.policies.clone_from(&self.policies);
        }
        if let Some(runs) = self.runs {
            sim.runs = runs;
        }
        if let Some(runtime) = self.runtime {
            sim.runtime = runtime;
        }
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if self.strict {
            sim.strict = true;
        }
        if self.trace_dir.is_some() {
            sim.record_load_trace = true;
        }
    }
}
