//! Sources of stochastic input driving a simulation run.
//!
//! The engine only talks to the [`InputSource`] trait, so the seeded
//! [`RandomInput`] used in experiments can be swapped for the deterministic
//! [`ScriptedInput`] in tests.

pub mod distribution;
pub mod random;
pub mod scripted;

pub use distribution::{Cdf, InputParams, Profiles};
pub use random::RandomInput;
pub use scripted::ScriptedInput;

use crate::sim::types::{SPOT_COUNT, SpotId};

/// Number of ranked spot choices drawn for every arriving car.
pub const RANKED_CHOICES: usize = 3;

/// Relative popularity of each spot as a driver's first choice.
pub const SPOT_PREFERENCE: [f64; SPOT_COUNT] = [0.15, 0.15, 0.15, 0.20, 0.15, 0.10, 0.10];

/// Draws consumed by the engine.
///
/// All times are in hours; `now` is the current simulation time. On every
/// arrival the engine draws the next gap, then the spot ranking, and only
/// for a car that found space the charging and connection times.
pub trait InputSource {
    /// Time until the next arrival after `now`.
    fn arrival_gap(&mut self, now: f64) -> f64;

    /// Active charging time needed by a newly arrived car.
    fn charging_time(&mut self) -> f64;

    /// Connection time of a car that needs `charging_time` of charging.
    fn connection_time(&mut self, charging_time: f64) -> f64;

    /// Facility-wide solar yield (kW per unit of installed panels) at `now`.
    fn solar_yield(&mut self, now: f64, summer: bool) -> f64;

    /// Distinct spots in the order the arriving driver tries them.
    fn rank_spots(&mut self) -> [SpotId; RANKED_CHOICES];
}

/// Draws [`RANKED_CHOICES`] distinct spots from `weights` without replacement.
///
/// After each draw the chosen weight is removed and the remaining ones are
/// renormalised. `uniform` must yield values in `[0, 1)`.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::input::{SPOT_PREFERENCE, rank_spots_with};
///
/// let mut draws = [0.0, 0.0, 0.0].into_iter();
/// let ranking = rank_spots_with(&SPOT_PREFERENCE, || draws.next().unwrap_or(0.0));
/// assert_eq!(ranking, [0, 1, 2]);
/// ```
pub fn rank_spots_with(
    weights: &[f64; SPOT_COUNT],
    mut uniform: impl FnMut() -> f64,
) -> [SpotId; RANKED_CHOICES] {
    let mut remaining = *weights;
    let mut ranking = [0; RANKED_CHOICES];

    for slot in &mut ranking {
        let total: f64 = remaining.iter().sum();
        let target = uniform() * total;
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (spot, &w) in remaining.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            chosen = Some(spot);
            if cumulative > target {
                break;
            }
        }
        // Rounding may leave the target just above the last cumulative value;
        // the last positive weight is taken then.
        let spot = chosen.unwrap_or(0);
        remaining[spot] = 0.0;
        *slot = spot;
    }

    ranking
}
