//! Console reports of batch results and policy comparisons.

use std::fmt::Write as _;

use crate::runner::{PolicyComparison, PolicyResults};

/// Renders every run report of `batch`.
pub fn render_runs(batch: &PolicyResults) -> String {
    let mut out = String::new();
    for (run, outcome) in batch.outcomes.iter().enumerate() {
        let _ = writeln!(out, "\n--- {} run {run} ---", batch.policy);
        let _ = writeln!(out, "{}", outcome.report);
    }
    out
}

/// Renders the average over the steady runs of `batch`.
pub fn render_average(batch: &PolicyResults) -> String {
    format!("\n--- {} average ---\n{}\n", batch.policy, batch.average)
}

/// Renders comparisons grouped by metric.
///
/// An asterisk marks intervals that exclude zero.
pub fn render_comparisons(comparisons: &[PolicyComparison], alpha: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n--- Paired-t {:.0}% confidence intervals ---",
        (1.0 - alpha) * 100.0
    );
    let mut current = None;
    for c in comparisons {
        if current != Some(c.metric) {
            let _ = writeln!(out, "{}:", c.metric.label());
            current = Some(c.metric);
        }
        let marker = if c.interval.contains_zero() { "" } else { " *" };
        let _ = writeln!(
            out,
            "  {:>17} - {:<17} {}{marker}",
            c.first.to_string(),
            c.second.to_string(),
            c.interval
        );
    }
    out
}

pub fn print_runs(batch: &PolicyResults) {
    print!("{}", render_runs(batch));
}

pub fn print_average(batch: &PolicyResults) {
    print!("{}", render_average(batch));
}

pub fn print_comparisons(comparisons: &[PolicyComparison], alpha: f64) {
    print!("{}", render_comparisons(comparisons, alpha));
}
