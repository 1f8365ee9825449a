/// A car visiting the facility.
///
/// All durations are in simulation time units (hours). The value is
/// immutable once constructed; whichever event or waiting queue holds it owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Car {
    arrival: f64,
    connection: f64,
    charge_remaining: f64,
}

impl Car {
    /// Creates a car that arrived at `arrival`, stays `connection` and needs
    /// `charge_remaining` of active charging.
    pub fn new(arrival: f64, connection: f64, charge_remaining: f64) -> Self {
        Self {
            arrival,
            connection,
            charge_remaining,
        }
    }

    pub fn arrival(&self) -> f64 {
        self.arrival
    }

    pub fn connection(&self) -> f64 {
        self.connection
    }

    pub fn charge_remaining(&self) -> f64 {
        self.charge_remaining
    }

    /// Time the car is expected to leave if it is not delayed.
    pub fn planned_departure(&self) -> f64 {
        self.arrival + self.connection
    }

    /// Latest moment charging can begin without the car overstaying its window.
    pub fn latest_feasible_start(&self) -> f64 {
        self.arrival + self.connection - self.charge_remaining
    }

    /// Delay of a departure at `time` beyond the planned departure, never negative.
    pub fn delay_at(&self, time: f64) -> f64 {
        (time - self.planned_departure()).max(0.0)
    }
}
