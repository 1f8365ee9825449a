//! Core simulation types: run configuration and facility-wide constants.

/// Number of physical parking spots in the facility.
pub const SPOT_COUNT: usize = 7;

/// Number of cables in the distribution tree (ids `0..CABLE_COUNT`).
pub const CABLE_COUNT: usize = 9;

/// Length of one simulated day in time units (hours).
pub const HOURS_PER_DAY: f64 = 24.0;

/// Zero-based parking spot index (`0..SPOT_COUNT`); spot "P1" is index 0.
pub type SpotId = usize;

/// Default number of spaces at each parking spot.
pub const DEFAULT_CAPACITIES: [u32; SPOT_COUNT] = [60, 80, 60, 70, 60, 60, 50];

/// Per-run simulation configuration.
///
/// One value is shared read-only by the engine, the facility state and the
/// accounting of a single run.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2400.0);
/// assert_eq!(cfg.runtime, 2400.0);
/// assert_eq!(cfg.max_time_without_steady_cycle(), 7200.0);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Measured time after the steady cycle is reached.
    pub runtime: f64,
    /// Power drawn by one active charging channel (kW).
    pub charging_rate_kw: f64,
    /// Cable rating used when deciding whether a car may start charging (kW).
    pub admission_threshold_kw: f64,
    /// Cable rating used when accumulating overloaded/underloaded time (kW).
    pub report_threshold_kw: f64,
    /// Physical spaces per spot.
    pub capacities: [u32; SPOT_COUNT],
    /// Installed solar multiplier per spot (0.0 = no panels).
    pub solar_installed: [f64; SPOT_COUNT],
    /// Season flag selecting the summer column of the solar profile.
    pub summer: bool,
    /// Relative tolerance of the steady-cycle test.
    pub stability_tolerance: f64,
    /// Interval between steady-cycle checks.
    pub check_interval: f64,
    /// Multiple of `runtime` after which an unconverged run is cut off.
    pub convergence_factor: f64,
    /// Abort the run on the first invariant violation instead of logging it.
    pub strict: bool,
    /// Record every load recomputation into the accounting trace.
    pub record_load_trace: bool,
}

impl SimConfig {
    /// Creates a configuration with the facility defaults and the given runtime.
    ///
    /// # Panics
    ///
    /// Panics if `runtime` is not strictly positive.
    pub fn new(runtime: f64) -> Self {
        assert!(runtime > 0.0, "runtime must be > 0");
        Self {
            runtime,
            charging_rate_kw: 6.0,
            admission_threshold_kw: 200.0,
            report_threshold_kw: 220.0,
            capacities: DEFAULT_CAPACITIES,
            solar_installed: [0.0; SPOT_COUNT],
            summer: false,
            stability_tolerance: 0.05,
            check_interval: HOURS_PER_DAY,
            convergence_factor: 3.0,
            strict: false,
            record_load_trace: false,
        }
    }

    /// Simulated time after which the steady-cycle search gives up.
    pub fn max_time_without_steady_cycle(&self) -> f64 {
        self.convergence_factor * self.runtime
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(2400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_config_defaults() {
        let cfg = SimConfig::new(240.0);
        assert_eq!(cfg.charging_rate_kw, 6.0);
        assert_eq!(cfg.admission_threshold_kw, 200.0);
        assert_eq!(cfg.report_threshold_kw, 220.0);
        assert_eq!(cfg.capacities, DEFAULT_CAPACITIES);
        assert!(!cfg.strict);
        assert_eq!(cfg.max_time_without_steady_cycle(), 720.0);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_runtime_panics() {
        SimConfig::new(0.0);
    }
}
