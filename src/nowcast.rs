//! EPA NowCast estimate for PM2.5.
//!
//! A time-decayed weighted average over the sliding window: the more the
//! concentration varies inside the window, the faster older readings lose
//! weight, bounded below by a weight factor of 0.5.

use crate::models::Reading;
use crate::window::MEASUREMENT_WINDOW_LENGTH_SEC;

// ---

/// Lower bound for the NowCast weight factor.
pub const MIN_WEIGHT_FACTOR: f64 = 0.5;

/// Compute the NowCast concentration for a window snapshot.
///
/// Ages are measured against the last reading in `readings` (the most
/// recently inserted one) and expressed as a fraction of the window length.
///
/// Returns `None` when fewer than two readings are available or when the
/// weights sum to zero.
///
/// # Examples
///
/// ```
/// use airwatch::models::Reading;
/// use airwatch::nowcast::estimate;
/// use chrono::{Duration, Utc};
///
/// let t0 = Utc::now();
/// let readings = [Reading::new(t0, 10.0), Reading::new(t0 + Duration::seconds(60), 10.0)];
/// assert_eq!(estimate(&readings), Some(10.0));
/// assert_eq!(estimate(&readings[..1]), None);
/// ```
pub fn estimate(readings: &[Reading]) -> Option<f64> {
    // ---
    if readings.len() < 2 {
        return None;
    }
    let latest = readings.last()?.timestamp;

    let (min_pm, max_pm) = readings.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), r| (lo.min(r.concentration), hi.max(r.concentration)),
    );
    let scaled_rate_of_change = if max_pm != 0.0 {
        (max_pm - min_pm) / max_pm
    } else {
        0.0
    };
    let weight_factor = (1.0 - scaled_rate_of_change).max(MIN_WEIGHT_FACTOR);

    let window_secs = MEASUREMENT_WINDOW_LENGTH_SEC as f64;
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for reading in readings {
        let age_secs = (latest - reading.timestamp).num_milliseconds() as f64 / 1000.0;
        let weight = weight_factor.powf(age_secs / window_secs);
        weighted_sum += reading.concentration * weight;
        weight_sum += weight;
    }

    if weight_sum == 0.0 || !weight_sum.is_finite() {
        return None;
    }
    Some(weighted_sum / weight_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn readings(points: &[(i64, f64)]) -> Vec<Reading> {
        points.iter().map(|&(t, v)| Reading::new(at(t), v)).collect()
    }

    #[test]
    fn test_estimate_needs_two_readings() {
        assert_eq!(estimate(&[]), None);
        assert_eq!(estimate(&readings(&[(0, 42.0)])), None);
    }

    #[test]
    fn test_estimate_constant_values() {
        assert_eq!(estimate(&readings(&[(0, 10.0), (60, 10.0)])), Some(10.0));
        assert_eq!(
            estimate(&readings(&[(0, 12.0), (60, 12.0), (120, 12.0)])),
            Some(12.0)
        );
    }

    #[test]
    fn test_estimate_all_zero() {
        assert_eq!(estimate(&readings(&[(0, 0.0), (30, 0.0)])), Some(0.0));
    }

    #[test]
    fn test_estimate_weights_recent_readings_more() {
        // range = 10, max = 20 -> weight factor 0.5
        // weights: 0.5^(600/600) = 0.5 for the old reading, 1 for the latest
        let nowcast = estimate(&readings(&[(0, 10.0), (600, 20.0)])).unwrap();
        let expected = (10.0 * 0.5 + 20.0) / 1.5;
        assert!((nowcast - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weight_factor_is_clamped() {
        // range = 99, max = 100 -> 1 - 0.99 = 0.01, clamped to 0.5
        let nowcast = estimate(&readings(&[(0, 1.0), (300, 100.0)])).unwrap();
        let w_old = 0.5_f64.powf(0.5);
        let expected = (1.0 * w_old + 100.0) / (w_old + 1.0);
        assert!((nowcast - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unclamped_weight_factor() {
        // range = 2, max = 10 -> weight factor 0.8
        let nowcast = estimate(&readings(&[(0, 8.0), (300, 10.0)])).unwrap();
        let w_old = 0.8_f64.powf(0.5);
        let expected = (8.0 * w_old + 10.0) / (w_old + 1.0);
        assert!((nowcast - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ages_are_relative_to_last_reading() {
        // Lagging sensor: the last reading is older than the one before it,
        // so the earlier-inserted reading gets a weight above 1
        let nowcast = estimate(&readings(&[(600, 20.0), (0, 10.0)])).unwrap();
        let w_first = 0.5_f64.powf(-1.0);
        let expected = (20.0 * w_first + 10.0) / (w_first + 1.0);
        assert!((nowcast - expected).abs() < 1e-12);
    }
}
