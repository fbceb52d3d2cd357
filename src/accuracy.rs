//! Sensor-to-sensor accuracy comparison.
//!
//! When several sensors are sampled side by side, sensor 0 is the reference
//! and every other sensor is compared against it over the last N aligned
//! PM2.5 readings.

use serde::Serialize;

use crate::window::RingBuffer;

// ---

/// Aggregate agreement between the reference sensor and the others.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyReport {
    /// Mean of `|other - ref| / ref * 100`, averaged over non-reference sensors.
    pub relative_error_percent: Option<f64>,
    /// Spearman rank correlation with the reference, averaged over sensors.
    pub spearman_correlation: Option<f64>,
}

/// Compare every sensor buffer against the buffer at index 0.
///
/// Returns `None` unless there are at least two sensors and every buffer is
/// filled to capacity.
pub fn compare(buffers: &[RingBuffer<f64>]) -> Option<AccuracyReport> {
    // ---
    let (reference, others) = buffers.split_first()?;
    if others.is_empty() || !buffers.iter().all(RingBuffer::is_full) {
        return None;
    }

    let reference = reference.to_vec();
    let mut errors = Vec::with_capacity(others.len());
    let mut correlations = Vec::with_capacity(others.len());
    for other in others {
        let other = other.to_vec();
        if let Some(err) = mean_relative_error_percent(&reference, &other) {
            errors.push(err);
        }
        if let Some(rho) = spearman(&reference, &other) {
            correlations.push(rho);
        }
    }

    Some(AccuracyReport {
        relative_error_percent: mean(&errors),
        spearman_correlation: mean(&correlations),
    })
}

/// Mean relative error of `other` against `reference`, in percent.
///
/// Samples whose error is not finite (a zero reference reading) are excluded;
/// `None` when nothing is left to average.
pub fn mean_relative_error_percent(reference: &[f64], other: &[f64]) -> Option<f64> {
    let errors: Vec<f64> = reference
        .iter()
        .zip(other)
        .map(|(&r, &o)| (o - r).abs() / r * 100.0)
        .filter(|e| e.is_finite())
        .collect();
    mean(&errors)
}

/// Spearman rank correlation coefficient, ties ranked by their average rank.
///
/// `None` for fewer than two aligned points or when either series is constant.
pub fn spearman(a: &[f64], b: &[f64]) -> Option<f64> {
    // ---
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let rank_a = ranks(&a[..n]);
    let rank_b = ranks(&b[..n]);
    pearson(&rank_a, &rank_b)
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; tied entries share the mean of their positions
        let shared = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        cov += (xi - mx) * (yi - my);
        var_x += (xi - mx).powi(2);
        var_y += (yi - my).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
