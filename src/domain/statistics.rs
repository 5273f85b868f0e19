//! Statistics over price series: mean, sample standard deviation and
//! Pearson correlation.
//!
//! All functions are total. Degenerate input (too few points, flat series)
//! yields `0.0` rather than an error.

use crate::shared::types::PricePoint;

/// Decimal places kept on a reported correlation.
pub const CORRELATION_DECIMALS: i32 = 4;

/// Arithmetic mean of the prices, `0.0` for an empty slice.
pub fn mean(points: &[PricePoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.price).sum::<f64>() / points.len() as f64
}

/// Sample standard deviation (divisor `n - 1`), `0.0` when `n <= 1` or the
/// prices are all equal.
pub fn sample_std_dev(points: &[PricePoint]) -> f64 {
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    if prices.len() < 2 || is_flat(&prices) {
        return 0.0;
    }
    let (_, sum_sq) = deviation_sums(&prices, &prices);
    (sum_sq / (prices.len() - 1) as f64).sqrt()
}

/// Pearson correlation of two series, rounded to four decimals.
///
/// Both series are truncated to the shorter length by index, keeping the
/// order they were given in. Points are not aligned by timestamp, so the
/// result is only meaningful when both series were sampled over the same
/// window at a similar cadence.
///
/// Returns `0.0` when fewer than two pairs remain or either side has zero
/// variance.
pub fn pearson(a: &[PricePoint], b: &[PricePoint]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let xs: Vec<f64> = a[..n].iter().map(|p| p.price).collect();
    let ys: Vec<f64> = b[..n].iter().map(|p| p.price).collect();
    if is_flat(&xs) || is_flat(&ys) {
        return 0.0;
    }

    let divisor = (n - 1).max(1) as f64;
    let (cross, _) = deviation_sums(&xs, &ys);
    let (_, sum_sq_x) = deviation_sums(&xs, &xs);
    let (_, sum_sq_y) = deviation_sums(&ys, &ys);

    let covariance = cross / divisor;
    let std_x = (sum_sq_x / divisor).sqrt();
    let std_y = (sum_sq_y / divisor).sqrt();
    if std_x == 0.0 || std_y == 0.0 {
        return 0.0;
    }

    let correlation = covariance / (std_x * std_y);
    if !correlation.is_finite() {
        return 0.0;
    }
    round_to(correlation, CORRELATION_DECIMALS).clamp(-1.0, 1.0)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Returns (Σ dx·dy, Σ dx²) where dx, dy are deviations from each mean.
fn deviation_sums(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let mean_x = xs.iter().sum::<f64>() / xs.len() as f64;
    let mean_y = ys.iter().sum::<f64>() / ys.len() as f64;

    xs.iter()
        .zip(ys)
        .fold((0.0, 0.0), |(cross, sum_sq), (x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (cross + dx * dy, sum_sq + dx * dx)
        })
}

// Float means of identical values can drift by an ulp, which would leave a
// tiny non-zero variance behind.
fn is_flat(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
