//! Empirical demand and solar profiles and the sampling parameters applied to them.

use crate::error::InputError;
use crate::sim::types::HOURS_PER_DAY;

/// Share of the daily arrivals expected in each hour, starting at midnight.
pub const DEFAULT_ARRIVAL_SHARES: [f64; 24] = [
    0.0065, 0.0043, 0.0029, 0.0022, 0.0027, 0.0086, 0.0266, 0.0640, 0.1109, 0.1050, 0.0840,
    0.0690, 0.0670, 0.0670, 0.0620, 0.0590, 0.0560, 0.0480, 0.0380, 0.0290, 0.0230, 0.0170,
    0.0120, 0.0090,
];

/// Probability of a charging volume in each 1 kWh bin.
pub const DEFAULT_CHARGING_VOLUME: [f64; 40] = [
    0.0000, 0.0007, 0.0078, 0.0239, 0.0434, 0.0602, 0.0713, 0.0766, 0.0772, 0.0744, 0.0695,
    0.0635, 0.0570, 0.0506, 0.0445, 0.0389, 0.0338, 0.0293, 0.0253, 0.0218, 0.0188, 0.0162,
    0.0140, 0.0120, 0.0104, 0.0089, 0.0077, 0.0066, 0.0057, 0.0050, 0.0043, 0.0037, 0.0032,
    0.0028, 0.0024, 0.0021, 0.0019, 0.0016, 0.0014, 0.0012,
];

/// Probability of a connection time in each 1 hour bin.
pub const DEFAULT_CONNECTION_TIME: [f64; 24] = [
    0.0001, 0.0168, 0.0622, 0.0995, 0.1150, 0.1138, 0.1036, 0.0899, 0.0757, 0.0627, 0.0514,
    0.0419, 0.0340, 0.0276, 0.0224, 0.0182, 0.0148, 0.0121, 0.0099, 0.0081, 0.0067, 0.0055,
    0.0045, 0.0038,
];

/// Expected solar yield per installed unit for each hour, as `[winter, summer]`.
pub const DEFAULT_SOLAR: [[f64; 2]; 24] = [
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.01],
    [0.00, 0.05],
    [0.00, 0.12],
    [0.02, 0.22],
    [0.08, 0.32],
    [0.15, 0.40],
    [0.20, 0.45],
    [0.22, 0.47],
    [0.20, 0.45],
    [0.15, 0.40],
    [0.08, 0.32],
    [0.02, 0.22],
    [0.00, 0.12],
    [0.00, 0.05],
    [0.00, 0.01],
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.00],
    [0.00, 0.00],
];

/// Cumulative distribution over unit-width bins.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::input::Cdf;
///
/// let cdf = Cdf::from_pmf(&[1.0, 3.0]).unwrap();
/// assert_eq!(cdf.sample(0.2, 0.5), 0.5);
/// assert_eq!(cdf.sample(0.3, 0.5), 1.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cdf {
    cumulative: Vec<f64>,
}

impl Cdf {
    /// Normalises a probability mass function into a cumulative distribution.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Invalid`] if `pmf` is empty, has a negative or
    /// non-finite entry, or sums to zero.
    pub fn from_pmf(pmf: &[f64]) -> Result<Self, InputError> {
        if pmf.is_empty() {
            return Err(invalid("pmf", "must not be empty"));
        }
        if pmf.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(invalid("pmf", "entries must be finite and >= 0"));
        }
        let total: f64 = pmf.iter().sum();
        if total <= 0.0 {
            return Err(invalid("pmf", "must have positive mass"));
        }

        let mut running = 0.0;
        let cumulative = pmf
            .iter()
            .map(|p| {
                running += p / total;
                running
            })
            .collect();
        Ok(Self { cumulative })
    }

    pub fn bins(&self) -> usize {
        self.cumulative.len()
    }

    /// Inverse-CDF sample: index of the first bin whose cumulative value
    /// exceeds `u`, plus `offset` within that bin.
    ///
    /// A `u` beyond the last cumulative value (rounding) falls into the last bin.
    pub fn sample(&self, u: f64, offset: f64) -> f64 {
        let bin = self
            .cumulative
            .iter()
            .position(|&c| c > u)
            .unwrap_or(self.cumulative.len() - 1);
        bin as f64 + offset
    }
}

fn invalid(name: &'static str, message: &str) -> InputError {
    InputError::Invalid {
        name,
        message: message.to_string(),
    }
}

/// Scaling constants applied on top of the raw profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParams {
    /// Multiplier turning hourly arrival shares into expected arrivals per hour.
    pub arrival_scale: f64,
    /// Longest exponential gap accepted before the draw is repeated later on.
    pub max_gap: f64,
    /// Energy per hour delivered by one channel (kW); volume / rate = charge time.
    pub charging_rate_kw: f64,
    /// Minimum share of the connection time a car may spend charging.
    pub min_charge_ratio: f64,
    /// Multiplier turning the solar profile into facility yield (kW).
    pub solar_scale: f64,
    /// Standard deviation of the solar noise relative to the mean.
    pub solar_noise: f64,
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            arrival_scale: 750.0,
            max_gap: 2.0,
            charging_rate_kw: 6.0,
            min_charge_ratio: 0.7,
            solar_scale: 200.0,
            solar_noise: 0.15,
        }
    }
}

impl InputParams {
    /// Checks that the scaling constants describe a samplable demand.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), InputError> {
        if !(self.max_gap.is_finite() && self.max_gap > 0.0) {
            return Err(invalid("max_gap", "must be finite and > 0"));
        }
        if !(self.arrival_scale.is_finite() && self.arrival_scale > 0.0) {
            return Err(invalid("arrival_scale", "must be finite and > 0"));
        }
        if !(self.charging_rate_kw.is_finite() && self.charging_rate_kw > 0.0) {
            return Err(invalid("charging_rate_kw", "must be finite and > 0"));
        }
        if !(self.min_charge_ratio > 0.0 && self.min_charge_ratio <= 1.0) {
            return Err(invalid("min_charge_ratio", "must be in (0, 1]"));
        }
        if !(self.solar_scale.is_finite() && self.solar_scale >= 0.0) {
            return Err(invalid("solar_scale", "must be finite and >= 0"));
        }
        if !(self.solar_noise.is_finite() && self.solar_noise >= 0.0) {
            return Err(invalid("solar_noise", "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Raw demand and solar profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Profiles {
    /// Hourly arrival shares (24 values).
    pub arrival: [f64; 24],
    /// Charging volume pmf over 1 kWh bins.
    pub charging_volume: Vec<f64>,
    /// Connection time pmf over 1 hour bins.
    pub connection_time: Vec<f64>,
    /// Solar yield per hour as `[winter, summer]`.
    pub solar: [[f64; 2]; 24],
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            arrival: DEFAULT_ARRIVAL_SHARES,
            charging_volume: DEFAULT_CHARGING_VOLUME.to_vec(),
            connection_time: DEFAULT_CONNECTION_TIME.to_vec(),
            solar: DEFAULT_SOLAR,
        }
    }
}

impl Profiles {
    /// Checks that every profile can be sampled.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.arrival.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(invalid("arrival", "entries must be finite and >= 0"));
        }
        if self.arrival.iter().sum::<f64>() <= 0.0 {
            return Err(invalid("arrival", "must have at least one positive hour"));
        }
        Cdf::from_pmf(&self.charging_volume).map_err(|_| {
            invalid("charging_volume", "must be a non-empty pmf with positive mass")
        })?;
        Cdf::from_pmf(&self.connection_time).map_err(|_| {
            invalid("connection_time", "must be a non-empty pmf with positive mass")
        })?;
        if self.solar.iter().flatten().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(invalid("solar", "entries must be finite and >= 0"));
        }
        Ok(())
    }

    /// Expected arrivals per hour at `now`.
    ///
    /// Hourly values are taken to hold at the middle of their hour and are
    /// interpolated linearly in between, wrapping around midnight.
    pub fn arrival_rate(&self, now: f64, scale: f64) -> f64 {
        let shifted = (now - 0.5).rem_euclid(HOURS_PER_DAY);
        let hour = (shifted.floor() as usize).min(23);
        let next = (hour + 1) % 24;
        let frac = shifted - hour as f64;
        let here = self.arrival[hour];
        scale * (here + (self.arrival[next] - here) * frac)
    }

    /// Mean solar yield per installed unit at `now` before scaling.
    pub fn solar_mean(&self, now: f64, summer: bool) -> f64 {
        let hour = (now.rem_euclid(HOURS_PER_DAY).floor() as usize).min(23);
        self.solar[hour][usize::from(summer)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Profiles::default().validate().is_ok());
    }

    #[test]
    fn cdf_is_normalised() {
        let cdf = Cdf::from_pmf(&[2.0, 2.0, 4.0]).unwrap();
        assert_eq!(cdf.bins(), 3);
        assert_eq!(cdf.sample(0.0, 0.0), 0.0);
        assert_eq!(cdf.sample(0.25, 0.1), 1.1);
        assert_eq!(cdf.sample(0.5, 0.9), 2.9);
    }

    #[test]
    fn cdf_sample_clamps_to_last_bin() {
        let cdf = Cdf::from_pmf(&[0.5, 0.5]).unwrap();
        assert_eq!(cdf.sample(1.0, 0.25), 1.25);
        assert_eq!(cdf.sample(7.0, 0.0), 1.0);
    }

    #[test]
    fn cdf_rejects_degenerate_pmf() {
        assert!(Cdf::from_pmf(&[]).is_err());
        assert!(Cdf::from_pmf(&[0.0, 0.0]).is_err());
        assert!(Cdf::from_pmf(&[1.0, -0.5]).is_err());
        assert!(Cdf::from_pmf(&[f64::NAN]).is_err());
    }

    #[test]
    fn arrival_rate_interpolates_between_half_hours() {
        let mut profiles = Profiles::default();
        profiles.arrival = [0.0; 24];
        profiles.arrival[8] = 1.0;
        profiles.arrival[9] = 3.0;

        assert_eq!(profiles.arrival_rate(8.5, 1.0), 1.0);
        assert_eq!(profiles.arrival_rate(9.0, 1.0), 2.0);
        assert_eq!(profiles.arrival_rate(9.5, 10.0), 30.0);
        // Wraps to the next day.
        assert_eq!(profiles.arrival_rate(24.0 + 8.5, 1.0), 1.0);
    }

    #[test]
    fn arrival_rate_wraps_around_midnight() {
        let mut profiles = Profiles::default();
        profiles.arrival = [0.0; 24];
        profiles.arrival[23] = 2.0;
        profiles.arrival[0] = 4.0;
        assert_eq!(profiles.arrival_rate(0.0, 1.0), 3.0);
    }

    #[test]
    fn solar_mean_picks_season_column() {
        let profiles = Profiles::default();
        assert_eq!(profiles.solar_mean(12.3, false), 0.22);
        assert_eq!(profiles.solar_mean(36.0, true), 0.47);
        assert_eq!(profiles.solar_mean(2.0, true), 0.0);
    }

    #[test]
    fn params_reject_non_positive_max_gap() {
        assert!(InputParams::default().validate().is_ok());
        for max_gap in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let params = InputParams {
                max_gap,
                ..InputParams::default()
            };
            let err = params.validate().unwrap_err();
            assert!(matches!(err, InputError::Invalid { name: "max_gap", .. }));
        }
    }

    #[test]
    fn params_reject_bad_charge_ratio() {
        let params = InputParams {
            min_charge_ratio: 0.0,
            ..InputParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_arrival_profile() {
        let mut profiles = Profiles::default();
        profiles.arrival = [0.0; 24];
        assert!(profiles.validate().is_err());
    }
}
