//! Aggregation of per-run reports for one policy and scenario.

use std::fmt;

use serde::Serialize;

use crate::sim::accounting::PerformanceReport;
use crate::sim::types::CABLE_COUNT;

/// Scalar observed once per run and compared between policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CarsArrived,
    NonServed,
    FractionNonServed,
    NonServedPerDay,
    DelayedCars,
    MaxDelay,
    AverageDelay,
    MeanMaxLoad,
    OverloadFraction,
    UnderloadFraction,
    SolarUtilisation,
}

/// Number of per-run metrics.
pub const METRIC_COUNT: usize = 11;

impl Metric {
    /// Every metric, in reporting order.
    pub const ALL: [Metric; METRIC_COUNT] = [
        Metric::CarsArrived,
        Metric::NonServed,
        Metric::FractionNonServed,
        Metric::NonServedPerDay,
        Metric::DelayedCars,
        Metric::MaxDelay,
        Metric::AverageDelay,
        Metric::MeanMaxLoad,
        Metric::OverloadFraction,
        Metric::UnderloadFraction,
        Metric::SolarUtilisation,
    ];

    /// Column name used in exports.
    pub fn key(self) -> &'static str {
        match self {
            Self::CarsArrived => "cars_arrived",
            Self::NonServed => "non_served",
            Self::FractionNonServed => "fraction_non_served",
            Self::NonServedPerDay => "non_served_per_day",
            Self::DelayedCars => "delayed_cars",
            Self::MaxDelay => "max_delay",
            Self::AverageDelay => "average_delay",
            Self::MeanMaxLoad => "mean_max_load",
            Self::OverloadFraction => "overload_fraction",
            Self::UnderloadFraction => "underload_fraction",
            Self::SolarUtilisation => "solar_utilisation",
        }
    }

    /// Human-readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::CarsArrived => "Cars arrived",
            Self::NonServed => "Cars not served",
            Self::FractionNonServed => "Fraction not served",
            Self::NonServedPerDay => "Not served per day",
            Self::DelayedCars => "Delayed cars",
            Self::MaxDelay => "Max delay",
            Self::AverageDelay => "Average delay",
            Self::MeanMaxLoad => "Mean max cable load",
            Self::OverloadFraction => "Fraction of time overloaded",
            Self::UnderloadFraction => "Fraction of time underloaded",
            Self::SolarUtilisation => "Fraction of solar used",
        }
    }

    /// Value of this metric in `report`.
    pub fn of(self, report: &PerformanceReport) -> f64 {
        match self {
            Self::CarsArrived => report.cars_arrived as f64,
            Self::NonServed => report.non_served as f64,
            Self::FractionNonServed => report.fraction_non_served,
            Self::NonServedPerDay => report.non_served_per_day,
            Self::DelayedCars => report.delayed_cars as f64,
            Self::MaxDelay => report.max_delay,
            Self::AverageDelay => report.average_delay,
            Self::MeanMaxLoad => report.mean_max_load(),
            Self::OverloadFraction => report.mean_overload_fraction(),
            Self::UnderloadFraction => report.mean_underload_fraction(),
            Self::SolarUtilisation => report.solar_utilisation,
        }
    }
}

/// Per-run scalar observations of one policy and scenario, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Observations {
    rows: Vec<[f64; METRIC_COUNT]>,
}

impl Observations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds observations from reports in run order.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a PerformanceReport>) -> Self {
        let mut obs = Self::new();
        for report in reports {
            obs.push(report);
        }
        obs
    }

    pub fn push(&mut self, report: &PerformanceReport) {
        self.rows.push(Metric::ALL.map(|m| m.of(report)));
    }

    pub fn runs(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of `metric` across runs.
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        let idx = Metric::ALL.iter().position(|&m| m == metric).unwrap_or(0);
        self.rows.iter().map(|row| row[idx]).collect()
    }

    /// Row of every metric for run `run`.
    pub fn row(&self, run: usize) -> Option<&[f64; METRIC_COUNT]> {
        self.rows.get(run)
    }
}

/// Mean performance over the runs that reached a steady cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AveragePerformance {
    /// Number of runs included in the averages.
    pub runs: usize,
    /// Runs excluded because they never reached a steady cycle.
    pub skipped: usize,
    pub cars_arrived: f64,
    pub start_charging: f64,
    pub stop_charging: f64,
    pub max_inter_arrival: f64,
    pub non_served: f64,
    pub fraction_non_served: f64,
    pub non_served_per_day: f64,
    pub delayed_cars: f64,
    pub max_delay: f64,
    pub average_delay: f64,
    pub max_load: [f64; CABLE_COUNT],
    pub fraction_overloaded: [f64; CABLE_COUNT],
    pub fraction_underloaded: [f64; CABLE_COUNT],
    pub steady_cycle_day: f64,
    pub solar_utilisation: f64,
}

impl AveragePerformance {
    /// Averages every report that has a steady-cycle day.
    ///
    /// Returns the default (all zero) value with `runs == 0` when no run
    /// qualifies.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a PerformanceReport>) -> Self {
        let mut avg = Self::default();

        for r in reports {
            let Some(day) = r.steady_cycle_day else {
                avg.skipped += 1;
                continue;
            };
            avg.runs += 1;
            avg.cars_arrived += r.cars_arrived as f64;
            avg.start_charging += r.start_charging as f64;
            avg.stop_charging += r.stop_charging as f64;
            avg.max_inter_arrival += r.max_inter_arrival;
            avg.non_served += r.non_served as f64;
            avg.fraction_non_served += r.fraction_non_served;
            avg.non_served_per_day += r.non_served_per_day;
            avg.delayed_cars += r.delayed_cars as f64;
            avg.max_delay += r.max_delay;
            avg.average_delay += r.average_delay;
            for c in 0..CABLE_COUNT {
                avg.max_load[c] += r.max_load[c];
                avg.fraction_overloaded[c] += r.fraction_overloaded[c];
                avg.fraction_underloaded[c] += r.fraction_underloaded[c];
            }
            avg.steady_cycle_day += f64::from(day);
            avg.solar_utilisation += r.solar_utilisation;
        }

        if avg.runs > 0 {
            let n = avg.runs as f64;
            for v in [
                &mut avg.cars_arrived,
                &mut avg.start_charging,
                &mut avg.stop_charging,
                &mut avg.max_inter_arrival,
                &mut avg.non_served,
                &mut avg.fraction_non_served,
                &mut avg.non_served_per_day,
                &mut avg.delayed_cars,
                &mut avg.max_delay,
                &mut avg.average_delay,
                &mut avg.steady_cycle_day,
                &mut avg.solar_utilisation,
            ] {
                *v /= n;
            }
            for c in 0..CABLE_COUNT {
                avg.max_load[c] /= n;
                avg.fraction_overloaded[c] /= n;
                avg.fraction_underloaded[c] /= n;
            }
        }

        avg
    }
}

fn fmt_array(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.2}")).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for AveragePerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runs averaged:                {} ({} skipped)", self.runs, self.skipped)?;
        writeln!(f, "Cars arrived:                 {:.1}", self.cars_arrived)?;
        writeln!(f, "Steady cycle day:             {:.1}", self.steady_cycle_day)?;
        writeln!(f, "Cars not served:              {:.2}", self.non_served)?;
        writeln!(f, "Fraction not served:          {:.4}", self.fraction_non_served)?;
        writeln!(f, "Not served per day:           {:.3}", self.non_served_per_day)?;
        writeln!(f, "Max time between arrivals:    {:.3}", self.max_inter_arrival)?;
        writeln!(f, "Delayed cars:                 {:.2}", self.delayed_cars)?;
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
