//! Charging policies selectable per run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::car::Car;

/// Strategy deciding when an admitted car starts charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Charge on arrival at full rate, ignoring cable limits.
    Immediate,
    /// Queue when charging would add overload; serve by arrival time.
    Fcfs,
    /// Like [`Policy::Fcfs`] but serve by latest feasible start.
    EarliestFeasible,
    /// Start at the cheapest feasible tariff band, ignoring cable limits.
    PriceDriven,
}

impl Policy {
    /// Every policy, in reporting order.
    pub const ALL: [Policy; 4] = [
        Policy::Immediate,
        Policy::Fcfs,
        Policy::EarliestFeasible,
        Policy::PriceDriven,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Fcfs => "fcfs",
            Self::EarliestFeasible => "earliest_feasible",
            Self::PriceDriven => "price_driven",
        }
    }

    /// Whether arrivals may wait in per-spot queues for network headroom.
    pub fn uses_queues(self) -> bool {
        matches!(self, Self::Fcfs | Self::EarliestFeasible)
    }

    /// Waiting-queue key of `car`; smaller values are served first.
    pub fn priority_of(self, car: &Car) -> f64 {
        match self {
            Self::EarliestFeasible => car.latest_feasible_start(),
            _ => car.arrival(),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "immediate" | "base" => Ok(Self::Immediate),
            "fcfs" => Ok(Self::Fcfs),
            "earliest_feasible" | "elfs" => Ok(Self::EarliestFeasible),
            "price_driven" | "price" => Ok(Self::PriceDriven),
            other => Err(format!(
                "unknown policy '{other}' (expected immediate, fcfs, earliest_feasible or price_driven)"
            )),
        }
    }
}
