//! Paired-t confidence intervals for comparing two configurations.

use std::fmt;

use serde::Serialize;

use crate::error::StatsError;

/// Two-sided critical t values at alpha = 0.05 for 1..=30 degrees of freedom.
const T_95: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160,
    2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056,
    2.052, 2.048, 2.045, 2.042,
];

/// Two-sided critical t values at alpha = 0.01 for 1..=30 degrees of freedom.
const T_99: [f64; 30] = [
    63.657, 9.925, 5.841, 4.604, 4.032, 3.707, 3.499, 3.355, 3.250, 3.169, 3.106, 3.055, 3.012,
    2.977, 2.947, 2.921, 2.898, 2.878, 2.861, 2.845, 2.831, 2.819, 2.807, 2.797, 2.787, 2.779,
    2.771, 2.763, 2.756, 2.750,
];

/// Values beyond the dense tables as `(df, t_95, t_99)`.
const T_SPARSE: [(usize, f64, f64); 3] = [(40, 2.021, 2.704), (60, 2.000, 2.660), (120, 1.980, 2.617)];

/// Two-sided critical t value for `alpha` with `df` degrees of freedom.
///
/// Above 30 degrees of freedom the value of the largest tabulated `df` not
/// exceeding the request is used, which keeps intervals conservative.
///
/// # Errors
///
/// Returns [`StatsError::UnsupportedAlpha`] unless `alpha` is 0.05 or 0.01,
/// and [`StatsError::TooFewObservations`] for `df == 0`.
pub fn t_critical(alpha: f64, df: usize) -> Result<f64, StatsError> {
    let ninety_nine = if (alpha - 0.05).abs() < 1e-9 {
        false
    } else if (alpha - 0.01).abs() < 1e-9 {
        true
    } else {
        return Err(StatsError::UnsupportedAlpha(alpha));
    };
    if df == 0 {
        return Err(StatsError::TooFewObservations(1));
    }

    let dense = if ninety_nine { &T_99 } else { &T_95 };
    if df <= dense.len() {
        return Ok(dense[df - 1]);
    }
    let value = T_SPARSE
        .iter()
        .rev()
        .find(|(tab_df, _, _)| *tab_df <= df)
        .map_or(dense[dense.len() - 1], |&(_, t95, t99)| {
            if ninety_nine { t99 } else { t95 }
        });
    Ok(value)
}

/// Closed interval `[lower, upper]` around a mean difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn mean(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }

    /// Whether the difference is not significant at the interval's level.
    pub fn contains_zero(&self) -> bool {
        self.lower <= 0.0 && 0.0 <= self.upper
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lower, self.upper)
    }
}

/// Paired-t confidence interval for the mean of `a[i] - b[i]`.
///
/// # Errors
///
/// Returns [`StatsError::LengthMismatch`] if the slices differ in length,
/// [`StatsError::TooFewObservations`] for fewer than two pairs and
/// [`StatsError::UnsupportedAlpha`] for an untabulated `alpha`.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::stats::paired_t_confidence;
///
/// let a = [3.0, 4.0, 5.0];
/// let ci = paired_t_confidence(&a, &a, 0.05).unwrap();
/// assert_eq!((ci.lower, ci.upper), (0.0, 0.0));
/// ```
pub fn paired_t_confidence(a: &[f64], b: &[f64], alpha: f64) -> Result<ConfidenceInterval, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let n = a.len();
    if n < 2 {
        return Err(StatsError::TooFewObservations(n));
    }

    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let mean = diffs.iter().sum::<f64>() / n as f64;
    let variance = diffs.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let half_width = t_critical(alpha, n - 1)? * (variance / n as f64).sqrt();

    Ok(ConfidenceInterval {
        lower: mean - half_width,
        upper: mean + half_width,
    })
}

/// Interval comparing list `i` against list `j`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairwiseInterval {
    pub i: usize,
    pub j: usize,
    pub interval: ConfidenceInterval,
}

/// Paired-t intervals of `lists[i] - lists[j]` for every `i > j`.
///
/// # Errors
///
/// Propagates the first error of [`paired_t_confidence`].
pub fn all_pairwise_confidence(
    lists: &[Vec<f64>],
    alpha: f64,
) -> Result<Vec<PairwiseInterval>, StatsError> {
    let mut out = Vec::with_capacity(lists.len() * lists.len().saturating_sub(1) / 2);
    for i in 0..lists.len() {
        for j in 0..i {
            out.push(PairwiseInterval {
                i,
                j,
                interval: paired_t_confidence(&lists[i], &lists[j], alpha)?,
            });
        }
    }
    Ok(out)
}
