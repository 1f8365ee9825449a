//! Deterministic input replaying a fixed list of arrivals.

use std::collections::VecDeque;

use super::{InputSource, RANKED_CHOICES};
use crate::sim::types::SpotId;

/// One car to be replayed by [`ScriptedInput`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedArrival {
    pub time: f64,
    pub charge: f64,
    pub connection: f64,
    pub ranking: [SpotId; RANKED_CHOICES],
}

/// [`InputSource`] that replays scripted arrivals in order.
///
/// After the last scripted arrival the next gap is infinite, so no further
/// cars arrive. Solar yield is a constant.
///
/// The ranking is the first per-car draw the engine makes, so
/// [`rank_spots`](InputSource::rank_spots) moves on to the next scripted car
/// and the charge and connection draws that follow read that same car. A
/// car turned away consumes its script entry without drawing times.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::input::{InputSource, ScriptedInput};
///
/// let mut input = ScriptedInput::new()
///     .arrival(1.0, 2.0, 5.0, [0, 1, 2])
///     .arrival(1.5, 1.0, 3.0, [3, 4, 5]);
///
/// assert_eq!(input.arrival_gap(0.0), 1.0);
/// assert_eq!(input.rank_spots(), [0, 1, 2]);
/// assert_eq!(input.charging_time(), 2.0);
/// assert_eq!(input.arrival_gap(1.0), 0.5);
/// assert_eq!(input.rank_spots(), [3, 4, 5]);
/// assert!(input.arrival_gap(1.5).is_infinite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    times: VecDeque<f64>,
    cars: VecDeque<ScriptedArrival>,
    current: Option<ScriptedArrival>,
    solar_kw: f64,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an arrival at absolute time `time`.
    ///
    /// Arrivals must be added in non-decreasing time order.
    pub fn arrival(
        mut self,
        time: f64,
        charge: f64,
        connection: f64,
        ranking: [SpotId; RANKED_CHOICES],
    ) -> Self {
        let car = ScriptedArrival {
            time,
            charge,
            connection,
            ranking,
        };
        self.times.push_back(time);
        self.cars.push_back(car);
        self
    }

    /// Sets the constant solar yield returned for every update.
    pub fn with_solar(mut self, solar_kw: f64) -> Self {
        self.solar_kw = solar_kw;
        self
    }

    pub fn remaining(&self) -> usize {
        self.cars.len()
    }
}

impl InputSource for ScriptedInput {
    fn arrival_gap(&mut self, now: f64) -> f64 {
        match self.times.pop_front() {
            Some(time) => (time - now).max(0.0),
            None => f64::INFINITY,
        }
    }

    fn charging_time(&mut self) -> f64 {
        self.current.map_or(0.0, |car| car.charge)
    }

    fn connection_time(&mut self, charging_time: f64) -> f64 {
        self.current.map_or(charging_time, |car| car.connection)
    }

    fn solar_yield(&mut self, _now: f64, _summer: bool) -> f64 {
        self.solar_kw
    }

    fn rank_spots(&mut self) -> [SpotId; RANKED_CHOICES] {
        self.current = self.cars.pop_front();
        self.current.map_or([0, 1, 2], |car| car.ranking)
    }
}
