//! Time-of-use tariff and the start-time search used by price-driven charging.

use super::types::HOURS_PER_DAY;

/// Length of one tariff band.
pub const BAND_HOURS: f64 = 6.0;

/// Price per time unit of charging in each band, starting at midnight.
pub const BAND_PRICES: [f64; 4] = [16.0, 18.0, 22.0, 20.0];

/// Hours of the day that are always tried as start candidates.
const FIXED_CANDIDATES: [f64; 4] = [0.0, 8.0, 16.0, 20.0];

const EPS: f64 = 1e-9;

/// Price of charging for `duration` starting at hour-of-day `start`.
///
/// Integrates the band prices over `[start, start + duration)`, wrapping
/// across midnight as often as needed.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::sim::tariff::calculate_price;
///
/// assert_eq!(calculate_price(0.0, 2.0), 32.0);
/// assert_eq!(calculate_price(5.0, 2.0), 16.0 + 18.0);
/// ```
pub fn calculate_price(start: f64, duration: f64) -> f64 {
    let mut t = start.rem_euclid(HOURS_PER_DAY);
    let mut remaining = duration.max(0.0);
    let mut price = 0.0;

    while remaining > EPS {
        let band = ((t / BAND_HOURS) as usize).min(BAND_PRICES.len() - 1);
        let band_end = (band as f64 + 1.0) * BAND_HOURS;
        let span = (band_end - t).min(remaining);
        price += BAND_PRICES[band] * span;
        remaining -= span;
        t = if band_end >= HOURS_PER_DAY { 0.0 } else { band_end };
    }

    price
}

/// Chooses the cheapest feasible charging start for a car arriving at `now`.
///
/// Candidates are the current hour-of-day, the fixed hours in
/// [`FIXED_CANDIDATES`] and the hour at which charging would have to start to
/// finish exactly at departure. Each candidate maps to its next occurrence at
/// or after `now`; only those finishing within the connection window count.
/// The first cheapest candidate wins and the result never exceeds the latest
/// feasible start.
pub fn choose_start_time(now: f64, charge: f64, connection: f64) -> f64 {
    let latest = now + connection - charge;
    let mut candidates = Vec::with_capacity(FIXED_CANDIDATES.len() + 2);
    candidates.push(now.rem_euclid(HOURS_PER_DAY));
    candidates.extend(FIXED_CANDIDATES);
    candidates.push(latest.rem_euclid(HOURS_PER_DAY));

    let mut best: Option<(f64, f64)> = None;
    for hour in candidates {
        let wait = (hour - now).rem_euclid(HOURS_PER_DAY);
        if wait + charge > connection + EPS {
            continue;
        }
        let price = calculate_price(hour, charge);
        if best.is_none_or(|(best_price, _)| price < best_price) {
            best = Some((price, now + wait));
        }
    }

    best.map_or(now, |(_, start)| start).min(latest.max(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_within_single_band() {
        assert_eq!(calculate_price(1.0, 3.0), 48.0);
        assert_eq!(calculate_price(13.0, 2.0), 44.0);
    }

    #[test]
    fn price_spans_bands_and_midnight() {
        // 22:00 to 02:00 => 2h at 20 + 2h at 16.
        assert_eq!(calculate_price(22.0, 4.0), 72.0);
        // A full day costs the sum of all bands.
        assert_eq!(calculate_price(3.0, 24.0), 6.0 * (16.0 + 18.0 + 22.0 + 20.0));
    }

    #[test]
    fn price_of_multi_day_session() {
        let day = 6.0 * (16.0 + 18.0 + 22.0 + 20.0);
        assert!((calculate_price(0.0, 50.0) - (2.0 * day + 32.0)).abs() < 1e-9);
    }

    #[test]
    fn cheapest_band_preferred_over_other_candidates() {
        let cheapest = calculate_price(0.0, 2.0);
        let window_end = (0.0_f64 + 24.0 - 2.0).rem_euclid(24.0);
        for candidate in [0.0, 8.0, 16.0, 20.0, window_end] {
            assert!(cheapest <= calculate_price(candidate, 2.0));
        }
        assert_eq!(choose_start_time(0.0, 2.0, 24.0), 0.0);
    }

    #[test]
    fn start_waits_for_cheaper_band_when_window_allows() {
        // Arriving at 16:00 with a long stay: midnight is cheapest.
        let start = choose_start_time(16.0, 2.0, 12.0);
        assert_eq!(start, 24.0);
    }

    #[test]
    fn short_window_starts_immediately() {
        let start = choose_start_time(13.0, 2.0, 2.5);
        assert!(start >= 13.0);
        assert!(start + 2.0 <= 13.0 + 2.5 + 1e-9);
    }

    #[test]
    fn start_never_exceeds_latest_feasible_start() {
        for i in 0..96 {
            let now = 100.0 + i as f64 * 0.37;
            let start = choose_start_time(now, 3.3, 7.1);
            assert!(start >= now);
            assert!(start <= now + 7.1 - 3.3 + 1e-9);
        }
    }
}
