//! Cross-run aggregation and paired-t comparisons between policies.

pub mod aggregate;
pub mod ttest;

pub use aggregate::{AveragePerformance, METRIC_COUNT, Metric, Observations};
pub use ttest::{
    ConfidenceInterval, PairwiseInterval, all_pairwise_confidence, paired_t_confidence,
    t_critical,
};
