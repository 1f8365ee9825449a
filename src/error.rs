//! Error types shared across the simulator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sim::policy::Policy;
use crate::sim::types::SpotId;

/// Fatal conditions raised while a single run is executing.
#[derive(Debug, Error)]
pub enum SimError {
    /// Facility state broke one of its occupancy invariants (strict mode only).
    #[error("invariant violated at t={time:.3}: {detail}")]
    InvariantViolation { time: f64, detail: String },

    /// The scheduler ran dry before an end-of-simulation event was processed.
    #[error("event queue exhausted at t={time:.3} before the simulation ended")]
    EmptyEventQueue { time: f64 },

    /// An event that must carry a car arrived without one.
    #[error("{kind} event for spot {spot} carries no car")]
    MissingCar { kind: &'static str, spot: SpotId },
}

/// Failures while loading input profiles from disk.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read profile \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in \"{}\": {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("profile \"{}\" line {line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("profile {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Failures of the paired-observation statistics.
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("observation lists differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("at least two paired observations are required, got {0}")]
    TooFewObservations(usize),

    #[error("no critical t values tabulated for alpha = {0}")]
    UnsupportedAlpha(f64),
}

/// Failures of a batch of runs.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{policy} run {run} failed: {source}")]
    Sim {
        policy: Policy,
        run: usize,
        #[source]
        source: SimError,
    },
}
