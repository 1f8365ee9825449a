//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::InputError;
use crate::input::{InputParams, Profiles};
use crate::io::profiles;
use crate::sim::policy::Policy;
use crate::sim::types::{DEFAULT_CAPACITIES, HOURS_PER_DAY, SPOT_COUNT, SimConfig};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, repetitions and policy selection.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Parking spots and cable ratings.
    #[serde(default)]
    pub facility: FacilityConfig,
    /// Installed panels and season.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Arrival and charging demand parameters.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Optional profile files replacing the embedded defaults.
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

/// Run length, repetitions and policy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Measured hours after the steady cycle is reached (must be > 0).
    pub runtime: f64,
    /// Independent repetitions per policy (must be > 0).
    pub runs: usize,
    /// Master random seed; run `i` uses `seed + i`.
    pub seed: u64,
    /// Policies to compare.
    pub policies: Vec<Policy>,
    /// Abort a run on the first invariant violation.
    pub strict: bool,
    /// Relative tolerance of the steady-cycle test (0.0-1.0, exclusive).
    pub stability_tolerance: f64,
    /// Hours between steady-cycle checks.
    pub check_interval: f64,
    /// Multiple of `runtime` after which an unconverged run is cut off.
    pub convergence_factor: f64,
    /// Record the per-event cable load trace.
    pub record_load_trace: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runtime: 2400.0,
            runs: 5,
            seed: 42,
            policies: vec![Policy::Fcfs, Policy::EarliestFeasible],
            strict: false,
            stability_tolerance: 0.05,
            check_interval: HOURS_PER_DAY,
            convergence_factor: 3.0,
            record_load_trace: false,
        }
    }
}

/// Parking spots and cable ratings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacilityConfig {
    /// Physical spaces per spot, P1 first.
    pub capacities: [u32; SPOT_COUNT],
    /// Power of one charging channel (kW).
    pub charging_rate_kw: f64,
    /// Cable rating checked before a car may start charging (kW).
    pub admission_threshold_kw: f64,
    /// Cable rating used for overload accounting (kW).
    pub report_threshold_kw: f64,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            capacities: DEFAULT_CAPACITIES,
            charging_rate_kw: 6.0,
            admission_threshold_kw: 200.0,
            report_threshold_kw: 220.0,
        }
    }
}

/// Installed panels and season.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Installed capacity multiplier per spot (0.0 = no panels).
    pub installed: [f64; SPOT_COUNT],
    /// Use the summer column of the solar profile.
    pub summer: bool,
    /// Yield of one unit of installed capacity at profile value 1.0 (kW).
    pub scale: f64,
    /// Noise standard deviation relative to the mean yield.
    pub noise: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            installed: [0.0; SPOT_COUNT],
            summer: false,
            scale: 200.0,
            noise: 0.15,
        }
    }
}

/// Arrival and charging demand parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Expected arrivals per day spread over the hourly arrival shares.
    pub arrival_scale: f64,
    /// Longest single exponential draw before the gap is redrawn (hours).
    pub max_gap: f64,
    /// Minimum ratio of charging time to connection time (0.0-1.0).
    pub min_charge_ratio: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            arrival_scale: 750.0,
            max_gap: 2.0,
            min_charge_ratio: 0.7,
        }
    }
}

/// Optional `;`-separated profile files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    /// 24 hourly arrival shares.
    pub arrival: Option<PathBuf>,
    /// Charging volume pmf, one row per kWh bin.
    pub charging_volume: Option<PathBuf>,
    /// Connection time pmf, one row per hour bin.
    pub connection_time: Option<PathBuf>,
    /// `hour;winter;summer` solar yield table.
    pub solar: Option<PathBuf>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.runtime"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Panels on the two spots nearest the transformer.
const PANELS_NEAR: [f64; SPOT_COUNT] = [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// Panels spread over four spots on both aggregation branches.
const PANELS_WIDE: [f64; SPOT_COUNT] = [1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0];

impl ScenarioConfig {
    /// Returns the baseline scenario: no panels, winter.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            facility: FacilityConfig::default(),
            solar: SolarConfig::default(),
            demand: DemandConfig::default(),
            profiles: ProfilesConfig::default(),
        }
    }

    fn with_panels(installed: [f64; SPOT_COUNT], summer: bool) -> Self {
        Self {
            solar: SolarConfig {
                installed,
                summer,
                ..SolarConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Panels on P1 and P2, summer yields.
    pub fn solar_summer() -> Self {
        Self::with_panels(PANELS_NEAR, true)
    }

    /// Panels on P1 and P2, winter yields.
    pub fn solar_winter() -> Self {
        Self::with_panels(PANELS_NEAR, false)
    }

    /// Panels on P1, P2, P6 and P7, summer yields.
    pub fn solar_wide_summer() -> Self {
        Self::with_panels(PANELS_WIDE, true)
    }

    /// Panels on P1, P2, P6 and P7, winter yields.
    pub fn solar_wide_winter() -> Self {
        Self::with_panels(PANELS_WIDE, false)
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &[
        "baseline",
        "solar_summer",
        "solar_winter",
        "solar_wide_summer",
        "solar_wide_winter",
    ];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "solar_summer" => Ok(Self::solar_summer()),
            "solar_winter" => Ok(Self::solar_winter()),
            "solar_wide_summer" => Ok(Self::solar_wide_summer()),
            "solar_wide_winter" => Ok(Self::solar_wide_winter()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(s.runtime > 0.0, "simulation.runtime", "must be > 0");
        check(s.runs > 0, "simulation.runs", "must be > 0");
        check(!s.policies.is_empty(), "simulation.policies", "must name at least one policy");
        check(
            s.stability_tolerance > 0.0 && s.stability_tolerance < 1.0,
            "simulation.stability_tolerance",
            "must be in (0.0, 1.0)",
        );
        check(s.check_interval > 0.0, "simulation.check_interval", "must be > 0");
        check(
            s.convergence_factor >= 1.0,
            "simulation.convergence_factor",
            "must be >= 1",
        );

        let f = &self.facility;
        check(
            f.capacities.iter().all(|&c| c > 0),
            "facility.capacities",
            "every spot needs at least one space",
        );
        check(f.charging_rate_kw > 0.0, "facility.charging_rate_kw", "must be > 0");
        check(
            f.admission_threshold_kw > 0.0,
            "facility.admission_threshold_kw",
            "must be > 0",
        );
        check(
            f.report_threshold_kw > 0.0,
            "facility.report_threshold_kw",
            "must be > 0",
        );

        let sol = &self.solar;
        check(
            sol.installed.iter().all(|v| v.is_finite() && *v >= 0.0),
            "solar.installed",
            "factors must be finite and >= 0",
        );
        check(sol.scale >= 0.0, "solar.scale", "must be >= 0");
        check(sol.noise >= 0.0, "solar.noise", "must be >= 0");

        let d = &self.demand;
        check(d.arrival_scale > 0.0, "demand.arrival_scale", "must be > 0");
        check(d.max_gap > 0.0, "demand.max_gap", "must be > 0");
        check(
            d.min_charge_ratio > 0.0 && d.min_charge_ratio <= 1.0,
            "demand.min_charge_ratio",
            "must be in (0.0, 1.0]",
        );

        errors
    }

    /// Per-run engine configuration.
    ///
    /// Call only on a configuration that passed [`validate`](Self::validate).
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        let f = &self.facility;
        SimConfig {
            charging_rate_kw: f.charging_rate_kw,
            admission_threshold_kw: f.admission_threshold_kw,
            report_threshold_kw: f.report_threshold_kw,
            capacities: f.capacities,
            solar_installed: self.solar.installed,
            summer: self.solar.summer,
            stability_tolerance: s.stability_tolerance,
            check_interval: s.check_interval,
            convergence_factor: s.convergence_factor,
            strict: s.strict,
            record_load_trace: s.record_load_trace,
            ..SimConfig::new(s.runtime)
        }
    }

    /// Sampling parameters for the random input source.
    pub fn input_params(&self) -> InputParams {
        InputParams {
            arrival_scale: self.demand.arrival_scale,
            max_gap: self.demand.max_gap,
            charging_rate_kw: self.facility.charging_rate_kw,
            min_charge_ratio: self.demand.min_charge_ratio,
            solar_scale: self.solar.scale,
            solar_noise: self.solar.noise,
        }
    }

    /// Loads the configured profile files, using the embedded defaults for
    /// any that are not set.
    ///
    /// # Errors
    ///
    /// Returns an `InputError` if a file cannot be read or the resulting
    /// profiles are invalid.
    pub fn load_profiles(&self) -> Result<Profiles, InputError> {
        let mut out = Profiles::default();
        let p = &self.profiles;
        if let Some(path) = &p.arrival {
            out.arrival = profiles::read_arrival_profile(path)?;
        }
        if let Some(path) = &p.charging_volume {
            out.charging_volume = profiles::read_series(path)?;
        }
        if let Some(path) = &p.connection_time {
            out.connection_time = profiles::read_series(path)?;
        }
        if let Some(path) = &p.solar {
            out.solar = profiles::read_solar_profile(path)?;
        }
        out.validate()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_baseline() {
        let cfg = ScenarioConfig::from_preset("baseline");
        assert!(cfg.is_ok());
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(err.field, "preset");
        assert!(err.message.contains("solar_summer"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
runtime = 480.0
runs = 3
seed = 7
policies = ["immediate", "price_driven"]
strict = true

[facility]
capacities = [10, 10, 10, 10, 10, 10, 10]
charging_rate_kw = 7.0
admission_threshold_kw = 150.0
report_threshold_kw = 160.0

[solar]
installed = [0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5]
summer = true
scale = 100.0
noise = 0.1

[demand]
arrival_scale = 500.0
max_gap = 1.5
min_charge_ratio = 0.8

[profiles]
arrival = "data/arrival_hours.csv"
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.simulation.runs, 3);
        assert_eq!(
            cfg.simulation.policies,
            vec![Policy::Immediate, Policy::PriceDriven]
        );
        assert_eq!(cfg.facility.capacities, [10; SPOT_COUNT]);
        assert!(cfg.solar.summer);
        assert_eq!(cfg.demand.max_gap, 1.5);
        assert_eq!(
            cfg.profiles.arrival.as_deref(),
            Some(Path::new("data/arrival_hours.csv"))
        );
        assert!(cfg.profiles.solar.is_none());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
runtime = 100.0
bogus_field = 42
"#;
        let err = ScenarioConfig::from_toml_str(toml).unwrap_err();
        assert_eq!(err.field, "toml");
    }

    #[test]
    fn unknown_policy_name_is_rejected() {
        let toml = r#"
[simulation]
policies = ["round_robin"]
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_runtime_and_runs() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.runtime = 0.0;
        cfg.simulation.runs = 0;
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["simulation.runtime", "simulation.runs"]);
    }

    #[test]
    fn validation_catches_empty_policies() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.policies.clear();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.policies"));
    }

    #[test]
    fn validation_catches_negative_panels() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.solar.installed[3] = -1.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "solar.installed"));
    }

    #[test]
    fn validation_catches_bad_charge_ratio() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.demand.min_charge_ratio = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "demand.min_charge_ratio"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn solar_presets_differ_in_season_and_panels() {
        let summer = ScenarioConfig::solar_summer();
        let winter = ScenarioConfig::solar_winter();
        let wide = ScenarioConfig::solar_wide_summer();
        assert!(summer.solar.summer);
        assert!(!winter.solar.summer);
        assert_eq!(summer.solar.installed, winter.solar.installed);
        let total = |c: &ScenarioConfig| c.solar.installed.iter().sum::<f64>();
        assert!(total(&wide) > total(&summer));
        assert_eq!(total(&ScenarioConfig::baseline()), 0.0);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        // seed overridden
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        // runtime kept default
        assert_eq!(cfg.as_ref().map(|c| c.simulation.runtime), Some(2400.0));
        // facility kept default
        assert_eq!(
            cfg.as_ref().map(|c| c.facility.report_threshold_kw),
            Some(220.0)
        );
    }

    #[test]
    fn sim_config_carries_scenario_values() {
        let mut cfg = ScenarioConfig::solar_wide_winter();
        cfg.simulation.runtime = 240.0;
        cfg.simulation.strict = true;
        let sim = cfg.sim_config();
        assert_eq!(sim.runtime, 240.0);
        assert!(sim.strict);
        assert!(!sim.summer);
        assert_eq!(sim.solar_installed, PANELS_WIDE);
        assert_eq!(sim.max_time_without_steady_cycle(), 720.0);

        let params = cfg.input_params();
        assert_eq!(params.arrival_scale, 750.0);
        assert_eq!(params.charging_rate_kw, 6.0);
    }

    #[test]
    fn missing_profiles_fall_back_to_defaults() {
        let cfg = ScenarioConfig::baseline();
        let profiles = cfg.load_profiles().unwrap();
        assert_eq!(profiles.arrival, Profiles::default().arrival);
    }

    #[test]
    fn unreadable_profile_file_is_reported() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.profiles.solar = Some(PathBuf::from("/nonexistent/solar.csv"));
        assert!(matches!(cfg.load_profiles(), Err(InputError::Io { .. })));
    }
}
