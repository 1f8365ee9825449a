//! Batch driver: repeated runs per policy and cross-policy comparison.
//!
//! Run `i` of every policy is seeded with `seed + i`, so the per-run
//! observations of two policies form paired samples.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::error::{RunError, StatsError};
use crate::input::{Profiles, RandomInput};
use crate::sim::engine::{Engine, RunOutcome};
use crate::sim::policy::Policy;
use crate::stats::{AveragePerformance, ConfidenceInterval, Metric, Observations, all_pairwise_confidence};

/// Every run of one policy, in run order, with its aggregates.
#[derive(Debug, Clone)]
pub struct PolicyResults {
    pub policy: Policy,
    pub outcomes: Vec<RunOutcome>,
    pub observations: Observations,
    pub average: AveragePerformance,
}

impl PolicyResults {
    fn new(policy: Policy, outcomes: Vec<RunOutcome>) -> Self {
        let reports = outcomes.iter().map(|o| &o.report);
        let observations = Observations::from_reports(reports.clone());
        let average = AveragePerformance::from_reports(reports);
        Self {
            policy,
            outcomes,
            observations,
            average,
        }
    }
}

/// Seed of run `run` under master seed `seed`.
pub fn run_seed(seed: u64, run: usize) -> u64 {
    seed.wrapping_add(run as u64)
}

/// Executes run number `run` of `policy`.
///
/// # Errors
///
/// Returns [`RunError::Input`] if the profiles cannot be sampled and
/// [`RunError::Sim`] if the engine fails.
pub fn run_single(
    config: &ScenarioConfig,
    profiles: &Profiles,
    policy: Policy,
    run: usize,
) -> Result<RunOutcome, RunError> {
    let input = RandomInput::new(
        profiles,
        config.input_params(),
        run_seed(config.simulation.seed, run),
    )?;
    let mut engine = Engine::new(config.sim_config(), policy, input);
    engine
        .run()
        .map_err(|source| RunError::Sim { policy, run, source })
}

/// Executes every run of `policy` in parallel and collects them in run order.
///
/// # Errors
///
/// Returns the error of the lowest-numbered failing run.
pub fn run_policy(
    config: &ScenarioConfig,
    profiles: &Profiles,
    policy: Policy,
) -> Result<PolicyResults, RunError> {
    let runs = config.simulation.runs;
    info!(%policy, runs, seed = config.simulation.seed, "starting batch");

    let outcomes = (0..runs)
        .into_par_iter()
        .map(|run| run_single(config, profiles, policy, run))
        .collect::<Result<Vec<_>, _>>()?;

    let results = PolicyResults::new(policy, outcomes);
    info!(
        %policy,
        steady = results.average.runs,
        skipped = results.average.skipped,
        "batch finished"
    );
    Ok(results)
}

/// Executes the batch of every configured policy, in configuration order.
///
/// # Errors
///
/// Stops at the first failing batch.
pub fn run_all(config: &ScenarioConfig, profiles: &Profiles) -> Result<Vec<PolicyResults>, RunError> {
    config
        .simulation
        .policies
        .iter()
        .map(|&policy| run_policy(config, profiles, policy))
        .collect()
}

/// Paired-t interval of `first - second` for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyComparison {
    pub metric: Metric,
    pub first: Policy,
    pub second: Policy,
    pub interval: ConfidenceInterval,
}

/// Pairwise comparisons of every policy pair on every metric.
///
/// Returns an empty list for fewer than two policies.
///
/// # Errors
///
/// Returns a [`StatsError`] if the batches have fewer than two runs or differ
/// in length, or `alpha` has no tabulated critical values.
pub fn compare(results: &[PolicyResults], alpha: f64) -> Result<Vec<PolicyComparison>, StatsError> {
    let mut out = Vec::new();
    if results.len() < 2 {
        return Ok(out);
    }
    for metric in Metric::ALL {
        let lists: Vec<Vec<f64>> = results
            .iter()
            .map(|r| r.observations.column(metric))
            .collect();
        for pair in all_pairwise_confidence(&lists, alpha)? {
            out.push(PolicyComparison {
                metric,
                first: results[pair.i].policy,
                second: results[pair.j].policy,
                interval: pair.interval,
            });
        }
    }
    Ok(out)
}
