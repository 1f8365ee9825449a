//! Discrete-event simulator comparing EV smart-charging policies at a
//! parking facility fed by a capacity-limited cable network with solar.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod io;
pub mod reporting;
pub mod runner;
/// Simulation engine, facility state, network and event modules.
pub mod sim;
pub mod stats;
