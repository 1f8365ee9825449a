//! Running performance counters of a single run and their derived report.

use std::fmt;

use serde::Serialize;

use super::car::Car;
use super::state::FacilityState;
use super::types::{CABLE_COUNT, HOURS_PER_DAY, SPOT_COUNT};

/// Cable loads at one recomputation instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSample {
    /// Time relative to the start of the measurement window.
    pub time: f64,
    pub cables: [f64; CABLE_COUNT],
    pub transformer: f64,
}

/// Counters updated incrementally by event handlers.
///
/// Durations are integrated with the left endpoint: the load that was valid
/// before a recomputation is credited for the time elapsed since the previous
/// one. Derived ratios are only produced by [`PerformanceMeasures::report`].
#[derive(Debug, Clone)]
pub struct PerformanceMeasures {
    window_start: f64,
    last_update: f64,
    report_threshold_kw: f64,

    pub cars_arrived: u64,
    pub cars_served: u64,
    pub non_served: u64,
    pub start_charging: u64,
    pub stop_charging: u64,
    pub max_inter_arrival: f64,

    pub delayed_cars: u64,
    pub total_delay: f64,
    pub max_delay: f64,

    pub max_load: [f64; CABLE_COUNT],
    pub max_transformer_load: f64,
    pub time_overloaded: [f64; CABLE_COUNT],
    pub time_underloaded: [f64; CABLE_COUNT],

    pub solar_used: [f64; SPOT_COUNT],
    pub solar_generated: [f64; SPOT_COUNT],
    last_solar_used: [f64; SPOT_COUNT],
    last_solar_generated: [f64; SPOT_COUNT],

    pub steady_cycle_day: Option<u32>,
    pub invariant_violations: u64,
    trace: Option<Vec<LoadSample>>,
}

impl PerformanceMeasures {
    /// Creates empty counters whose measurement window starts at `start`.
    ///
    /// # Arguments
    ///
    /// * `start` - Simulation time the window opens
    /// * `report_threshold_kw` - Cable rating for overloaded/underloaded time
    /// * `record_trace` - Keep a [`LoadSample`] for every recomputation
    pub fn new(start: f64, report_threshold_kw: f64, record_trace: bool) -> Self {
        Self {
            window_start: start,
            last_update: start,
            report_threshold_kw,
            cars_arrived: 0,
            cars_served: 0,
            non_served: 0,
            start_charging: 0,
            stop_charging: 0,
            max_inter_arrival: 0.0,
            delayed_cars: 0,
            total_delay: 0.0,
            max_delay: 0.0,
            max_load: [0.0; CABLE_COUNT],
            max_transformer_load: 0.0,
            time_overloaded: [0.0; CABLE_COUNT],
            time_underloaded: [0.0; CABLE_COUNT],
            solar_used: [0.0; SPOT_COUNT],
            solar_generated: [0.0; SPOT_COUNT],
            last_solar_used: [0.0; SPOT_COUNT],
            last_solar_generated: [0.0; SPOT_COUNT],
            steady_cycle_day: None,
            invariant_violations: 0,
            trace: record_trace.then(Vec::new),
        }
    }

    /// Discards everything measured so far and opens a new window at `now`.
    ///
    /// The solar values currently in effect are carried over so the first
    /// interval of the new window is integrated correctly.
    pub fn restart(&mut self, now: f64) {
        let mut fresh = Self::new(now, self.report_threshold_kw, self.trace.is_some());
        fresh.last_solar_used = self.last_solar_used;
        fresh.last_solar_generated = self.last_solar_generated;
        *self = fresh;
    }

    pub fn window_start(&self) -> f64 {
        self.window_start
    }

    pub fn trace(&self) -> &[LoadSample] {
        self.trace.as_deref().unwrap_or_default()
    }

    /// Records an arrival and the gap until the next generated one.
    pub fn record_arrival(&mut self, gap_to_next: f64) {
        self.cars_arrived += 1;
        self.max_inter_arrival = self.max_inter_arrival.max(gap_to_next);
    }

    pub fn record_non_served(&mut self) {
        self.non_served += 1;
    }

    pub fn record_served(&mut self) {
        self.cars_served += 1;
    }

    /// Records a departure at `now` and any delay beyond the planned window.
    pub fn record_departure(&mut self, car: &Car, now: f64) {
        let delay = car.delay_at(now);
        if delay > 0.0 {
            self.delayed_cars += 1;
            self.total_delay += delay;
            self.max_delay = self.max_delay.max(delay);
        }
    }

    /// Integrates the previous load and solar values up to `now` and tracks
    /// the maxima of the freshly computed loads in `state`.
    pub fn record_loads(&mut self, state: &FacilityState, now: f64) {
        let dt = (now - self.last_update).max(0.0);

        for (cable, &old) in state.previous_load().cables.iter().enumerate() {
            if old > self.report_threshold_kw {
                self.time_overloaded[cable] += dt;
            } else {
                self.time_underloaded[cable] += dt;
            }
        }

        let load = state.load();
        for (max, &current) in self.max_load.iter_mut().zip(&load.cables) {
            *max = max.max(current);
        }
        self.max_transformer_load = self.max_transformer_load.max(load.transformer);

        for spot in 0..SPOT_COUNT {
            self.solar_used[spot] += dt * self.last_solar_used[spot];
            self.solar_generated[spot] += dt * self.last_solar_generated[spot];
        }
        self.last_solar_used = load.solar_used;
        self.last_solar_generated = *state.solar_kw();

        if let Some(trace) = &mut self.trace {
            trace.push(LoadSample {
                time: now - self.window_start,
                cables: load.cables,
                transformer: load.transformer,
            });
        }

        self.last_update = now;
    }

    /// Derives the per-run report for a window ending at `end_time`.
    ///
    /// Pure function of the counters: calling it repeatedly yields the same
    /// report.
    pub fn report(&self, end_time: f64) -> PerformanceReport {
        let window = (end_time - self.window_start).max(0.0);
        let per_window = |x: f64| if window > 0.0 { x / window } else { 0.0 };
        let cars = self.cars_arrived as f64;
        let solar_used: f64 = self.solar_used.iter().sum();
        let solar_generated: f64 = self.solar_generated.iter().sum();

        PerformanceReport {
            window,
            steady_cycle_day: self.steady_cycle_day,
            cars_arrived: self.cars_arrived,
            cars_served: self.cars_served,
            non_served: self.non_served,
            fraction_non_served: ratio(self.non_served as f64, cars),
            non_served_per_day: ratio(self.non_served as f64, window / HOURS_PER_DAY),
            start_charging: self.start_charging,
            stop_charging: self.stop_charging,
            max_inter_arrival: self.max_inter_arrival,
            delayed_cars: self.delayed_cars,
            max_delay: self.max_delay,
            average_delay: ratio(self.total_delay, cars),
            average_delay_of_delayed: ratio(self.total_delay, self.delayed_cars as f64),
            max_load: self.max_load,
            max_transformer_load: self.max_transformer_load,
            fraction_overloaded: self.time_overloaded.map(per_window),
            fraction_underloaded: self.time_underloaded.map(per_window),
            solar_used,
            solar_generated,
            solar_utilisation: ratio(solar_used, solar_generated),
            invariant_violations: self.invariant_violations,
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Finalized performance figures of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    /// Length of the measurement window.
    pub window: f64,
    /// Day on which the steady cycle was detected, if it ever was.
    pub steady_cycle_day: Option<u32>,
    pub cars_arrived: u64,
    pub cars_served: u64,
    pub non_served: u64,
    pub fraction_non_served: f64,
    pub non_served_per_day: f64,
    pub start_charging: u64,
    pub stop_charging: u64,
    pub max_inter_arrival: f64,
    pub delayed_cars: u64,
    pub max_delay: f64,
    /// Total delay divided by all arrived cars.
    pub average_delay: f64,
    /// Total delay divided by delayed cars only.
    pub average_delay_of_delayed: f64,
    pub max_load: [f64; CABLE_COUNT],
    pub max_transformer_load: f64,
    pub fraction_overloaded: [f64; CABLE_COUNT],
    pub fraction_underloaded: [f64; CABLE_COUNT],
    pub solar_used: f64,
    pub solar_generated: f64,
    /// Share of generated solar energy offset against charging demand.
    pub solar_utilisation: f64,
    pub invariant_violations: u64,
}

impl PerformanceReport {
    /// Mean over cables of the per-cable maximum load.
    pub fn mean_max_load(&self) -> f64 {
        mean(&self.max_load)
    }

    /// Mean over cables of the overloaded time fraction.
    pub fn mean_overload_fraction(&self) -> f64 {
        mean(&self.fraction_overloaded)
    }

    /// Mean over cables of the underloaded time fraction.
    pub fn mean_underload_fraction(&self) -> f64 {
        mean(&self.fraction_underloaded)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn fmt_array(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.2}")).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self
            .steady_cycle_day
            .map_or_else(|| "never".to_string(), |d| d.to_string());
        writeln!(f, "Cars arrived:                 {}", self.cars_arrived)?;
        writeln!(f, "Steady cycle reached on day:  {day}")?;
        writeln!(f, "Cars not served:              {}", self.non_served)?;
        writeln!(f, "Fraction not served:          {:.4}", self.fraction_non_served)?;
        writeln!(f, "Not served per day:           {:.3}", self.non_served_per_day)?;
        writeln!(f, "Max time between arrivals:    {:.3}", self.max_inter_arrival)?;
        writeln!(f, "Delayed cars:                 {}", self.delayed_cars)?;
        writeln!(f, "Max delay:                    {:.3}", self.max_delay)?;
        writeln!(f, "Average delay:                {:.4}", self.average_delay)?;
        writeln!(f, "Max load per cable:           {}", fmt_array(&self.max_load))?;
        writeln!(
            f,
            "Fraction of time overloaded:  {}",
            fmt_array(&self.fraction_overloaded)
        )?;
        writeln!(
            f,
            "Fraction of time underloaded: {}",
            fmt_array(&self.fraction_underloaded)
        )?;
        write!(f, "Fraction of solar used:       {:.4}", self.solar_utilisation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::network::Topology;
    use crate::sim::types::SimConfig;

    fn facility() -> (Topology, FacilityState) {
        let mut cfg = SimConfig::new(100.0);
        cfg.solar_installed = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        (Topology::standard(6.0), FacilityState::new(&cfg))
    }

    #[test]
    fn arrival_tracks_count_and_max_gap() {
        let mut pm = PerformanceMeasures::new(0.0, 220.0, false);
        pm.record_arrival(0.5);
        pm.record_arrival(1.7);
        pm.record_arrival(0.2);
        assert_eq!(pm.cars_arrived, 3);
        assert_eq!(pm.max_inter_arrival, 1.7);
    }

    #[test]
    fn departure_counts_only_positive_delays() {
        let mut pm = PerformanceMeasures::new(0.0, 220.0, false);
        let car = Car::new(0.0, 5.0, 2.0);
        pm.record_departure(&car, 5.0);
        pm.record_departure(&car, 7.0);
        pm.record_departure(&car, 6.0);
        assert_eq!(pm.delayed_cars, 2);
        assert_eq!(pm.total_delay, 3.0);
        assert_eq!(pm.max_delay, 2.0);
    }

    #[test]
    fn overload_time_uses_previous_load() {
        let (topo, mut state) = facility();
        let mut pm = PerformanceMeasures::new(0.0, 220.0, false);

        // 37 channels at P1 => 222 kW, above the reporting threshold.
        for _ in 0..37 {
            state.occupy(0);
            state.start_charging(0);
        }
        state.refresh_loads(&topo, 1.0);
        pm.record_loads(&state, 1.0);
        // Interval [0, 1) had the idle load.
        assert_eq!(pm.time_overloaded[1], 0.0);
        assert_eq!(pm.time_underloaded[1], 1.0);
        assert_eq!(pm.max_load[1], 222.0);

        state.refresh_loads(&topo, 3.0);
        pm.record_loads(&state, 3.0);
        assert_eq!(pm.time_overloaded[1], 2.0);
        assert_eq!(pm.time_overloaded[0], 2.0);
        assert_eq!(pm.time_underloaded[5], 3.0);
    }

    #[test]
    fn solar_integrates_left_endpoint() {
        let (topo, mut state) = facility();
        let mut pm = PerformanceMeasures::new(0.0, 220.0, false);

        state.occupy(0);
        state.start_charging(0);
        state.set_solar_yield(10.0);
        state.refresh_loads(&topo, 0.0);
        pm.record_loads(&state, 0.0);

        state.refresh_loads(&topo, 2.0);
        pm.record_loads(&state, 2.0);

        assert_eq!(pm.solar_generated[0], 20.0);
        assert_eq!(pm.solar_used[0], 12.0);
        let report = pm.report(2.0);
        assert!((report.solar_utilisation - 0.6).abs() < 1e-12);
    }

    #[test]
    fn restart_clears_counters_and_moves_window() {
        let mut pm = PerformanceMeasures::new(0.0, 220.0, true);
        pm.record_arrival(1.0);
        pm.record_non_served();
        pm.restart(48.0);
        assert_eq!(pm.cars_arrived, 0);
        assert_eq!(pm.non_served, 0);
        assert_eq!(pm.window_start(), 48.0);
        assert!(pm.trace().is_empty());
    }

    #[test]
    fn report_is_idempotent() {
        let mut pm = PerformanceMeasures::new(24.0, 220.0, false);
        for _ in 0..10 {
            pm.record_arrival(0.3);
        }
        pm.record_non_served();
        pm.record_departure(&Car::new(24.0, 1.0, 0.5), 26.0);
        pm.time_overloaded[2] = 12.0;

        let first = pm.report(72.0);
        let second = pm.report(72.0);
        assert_eq!(first, second);
        assert_eq!(first.window, 48.0);
        assert!((first.fraction_non_served - 0.1).abs() < 1e-12);
        assert!((first.non_served_per_day - 0.5).abs() < 1e-12);
        assert!((first.fraction_overloaded[2] - 0.25).abs() < 1e-12);
        assert!((first.average_delay - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_report_has_zero_ratios() {
        let pm = PerformanceMeasures::new(0.0, 220.0, false);
        let report = pm.report(0.0);
        assert_eq!(report.fraction_non_served, 0.0);
        assert_eq!(report.non_served_per_day, 0.0);
        assert_eq!(report.solar_utilisation, 0.0);
        assert_eq!(report.mean_overload_fraction(), 0.0);
    }

    #[test]
    fn report_display_does_not_panic() {
        let pm = PerformanceMeasures::new(0.0, 220.0, false);
        let s = format!("{}", pm.report(10.0));
        assert!(s.contains("Cars arrived"));
    }
}
