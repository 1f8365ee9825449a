//! Seeded random input built from empirical profiles.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::distribution::{Cdf, InputParams, Profiles};
use super::{InputSource, RANKED_CHOICES, SPOT_PREFERENCE, rank_spots_with};
use crate::error::InputError;
use crate::sim::types::SpotId;

/// Generates Gaussian noise using the Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Value from a Gaussian distribution with mean 0 and the given standard
/// deviation, or 0 when `std_dev` is not positive.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// [`InputSource`] drawing from profiles with a seeded [`StdRng`].
///
/// Two instances built from the same profiles, parameters and seed produce
/// identical draw sequences.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::input::{InputParams, InputSource, Profiles, RandomInput};
///
/// let mut a = RandomInput::new(&Profiles::default(), InputParams::default(), 7).unwrap();
/// let mut b = RandomInput::new(&Profiles::default(), InputParams::default(), 7).unwrap();
/// assert_eq!(a.arrival_gap(8.0), b.arrival_gap(8.0));
/// ```
pub struct RandomInput {
    rng: StdRng,
    params: InputParams,
    profiles: Profiles,
    charging: Cdf,
    connection: Cdf,
}

impl RandomInput {
    /// Creates a source seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Invalid`] if a profile cannot be sampled or a
    /// parameter is out of range.
    pub fn new(profiles: &Profiles, params: InputParams, seed: u64) -> Result<Self, InputError> {
        profiles.validate()?;
        params.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            charging: Cdf::from_pmf(&profiles.charging_volume)?,
            connection: Cdf::from_pmf(&profiles.connection_time)?,
            profiles: profiles.clone(),
            params,
        })
    }

    fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

impl InputSource for RandomInput {
    fn arrival_gap(&mut self, now: f64) -> f64 {
        let max_gap = self.params.max_gap;
        let mut skipped = 0.0;
        loop {
            let rate = self
                .profiles
                .arrival_rate(now + skipped, self.params.arrival_scale);
            let u = self.uniform();
            if rate > 0.0 {
                let gap = -(1.0 - u).ln() / rate;
                if gap <= max_gap {
                    return skipped + gap;
                }
            }
            skipped += max_gap;
        }
    }

    fn charging_time(&mut self) -> f64 {
        let (u, offset) = (self.uniform(), self.uniform());
        self.charging.sample(u, offset) / self.params.charging_rate_kw
    }

    fn connection_time(&mut self, charging_time: f64) -> f64 {
        let (u, offset) = (self.uniform(), self.uniform());
        let connection = self.connection.sample(u, offset);
        if connection * self.params.min_charge_ratio < charging_time {
            charging_time / self.params.min_charge_ratio
        } else {
            connection
        }
    }

    fn solar_yield(&mut self, now: f64, summer: bool) -> f64 {
        let mean = self.profiles.solar_mean(now, summer) * self.params.solar_scale;
        let noise = gaussian_noise(&mut self.rng, self.params.solar_noise * mean);
        (mean + noise).max(0.0)
    }

    fn rank_spots(&mut self) -> [SpotId; RANKED_CHOICES] {
        let rng = &mut self.rng;
        rank_spots_with(&SPOT_PREFERENCE, || rng.random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(seed: u64) -> RandomInput {
        RandomInput::new(&Profiles::default(), InputParams::default(), seed).unwrap()
    }

    #[test]
    fn zero_max_gap_is_rejected() {
        let params = InputParams {
            max_gap: 0.0,
            ..InputParams::default()
        };
        assert!(RandomInput::new(&Profiles::default(), params, 1).is_err());
    }

    #[test]
    fn gaussian_noise_zero_std_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian_noise(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn gaussian_noise_has_roughly_requested_spread() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian_noise(&mut rng, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert!(mean.abs() < 0.1);
        assert!((var.sqrt() - 2.0).abs() < 0.1);
    }

    #[test]
    fn same_seed_same_sequence() {
        let (mut a, mut b) = (input(11), input(11));
        for step in 0..50 {
            let now = step as f64 * 0.7;
            assert_eq!(a.arrival_gap(now), b.arrival_gap(now));
            assert_eq!(a.charging_time(), b.charging_time());
            assert_eq!(a.rank_spots(), b.rank_spots());
            assert_eq!(a.solar_yield(now, true), b.solar_yield(now, true));
        }
    }

    #[test]
    fn gaps_are_positive() {
        let mut src = input(5);
        for step in 0..500 {
            let gap = src.arrival_gap(step as f64 * 0.37);
            assert!(gap >= 0.0);
            assert!(gap.is_finite());
        }
    }

    #[test]
    fn quiet_hours_skip_in_max_gap_steps() {
        let mut profiles = Profiles::default();
        profiles.arrival = [0.0; 24];
        profiles.arrival[12] = 1.0;
        let mut src = RandomInput::new(&profiles, InputParams::default(), 9).unwrap();
        // Nothing arrives before 11:30, so the gap spans at least five skips.
        let gap = src.arrival_gap(0.0);
        assert!(gap >= 10.0, "gap {gap}");
    }

    #[test]
    fn connection_always_leaves_room_to_charge() {
        let mut src = input(21);
        for _ in 0..1_000 {
            let charge = src.charging_time();
            let connection = src.connection_time(charge);
            assert!(charge >= 0.0);
            assert!(connection * 0.7 >= charge - 1e-9);
        }
    }

    #[test]
    fn solar_is_zero_at_night_and_non_negative() {
        let mut src = input(4);
        assert_eq!(src.solar_yield(2.0, true), 0.0);
        for hour in 0..48 {
            assert!(src.solar_yield(hour as f64, true) >= 0.0);
        }
    }

    #[test]
    fn ranking_is_distinct() {
        let mut src = input(8);
        for _ in 0..200 {
            let [a, b, c] = src.rank_spots();
            assert!(a != b && b != c && a != c);
        }
    }
}
