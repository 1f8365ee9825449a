/// Per-run performance counters and reports.
pub mod accounting;
pub mod car;
pub mod engine;
/// Typed events and the time-ordered event queue.
pub mod event;
/// Distribution tree and cable load model.
pub mod network;
pub mod policy;
pub mod state;
/// Time-of-use tariff used by price-driven charging.
pub mod tariff;
pub mod types;

pub use accounting::{LoadSample, PerformanceMeasures, PerformanceReport};
pub use car::Car;
pub use engine::{Engine, RunOutcome};
pub use policy::Policy;
pub use types::SimConfig;
