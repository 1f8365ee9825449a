//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use smart_charging_sim::config::ScenarioConfig;
use smart_charging_sim::input::ScriptedInput;
use smart_charging_sim::sim::engine::Engine;
use smart_charging_sim::sim::policy::Policy;
use smart_charging_sim::sim::types::SimConfig;

/// Strict run configuration with the facility defaults.
pub fn strict_config(runtime: f64) -> SimConfig {
    let mut cfg = SimConfig::new(runtime);
    cfg.strict = true;
    cfg
}

/// Configuration whose admission rating fits exactly one charging channel.
pub fn one_channel_config() -> SimConfig {
    let mut cfg = strict_config(48.0);
    cfg.admission_threshold_kw = cfg.charging_rate_kw;
    cfg
}

/// `count` cars arriving one hour apart from t=1, all preferring P1.
pub fn hourly_arrivals(count: usize, charge: f64, connection: f64) -> ScriptedInput {
    (1..=count).fold(ScriptedInput::new(), |input, k| {
        input.arrival(k as f64, charge, connection, [0, 1, 2])
    })
}

/// Processes every event scheduled at or before `until`.
pub fn advance_to(engine: &mut Engine<ScriptedInput>, until: f64) {
    while let Some(next) = engine.next_event_time() {
        if next > until || engine.is_finished() {
            break;
        }
        engine.step().expect("step should succeed");
    }
}

/// Short light-demand scenario for batch runs.
pub fn quick_scenario(policies: Vec<Policy>, runs: usize) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.runtime = 48.0;
    cfg.simulation.runs = runs;
    cfg.simulation.policies = policies;
    cfg.demand.arrival_scale = 150.0;
    cfg
}
