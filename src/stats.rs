//! Numeric primitives shared by the analytics pass.
//!
//! Every function is total: degenerate input (empty series, zero variance,
//! too few points) yields the documented sentinel instead of an error, so
//! callers must treat those sentinels as "insufficient data" rather than a
//! measured zero. Mismatched paired-series lengths are a caller bug and
//! fail fast.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BasicStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Percentile {
    pub p: u8,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Outliers {
    pub outliers: Vec<f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Weighted,
    Linear,
}

pub const DEFAULT_PERCENTILES: [u8; 5] = [10, 25, 50, 75, 90];

/// Window of most recent results considered by `consistency`.
pub const CONSISTENCY_WINDOW: usize = 10;

/// Most-recent-first blend weights used by `project_next_value`.
const PROJECTION_WEIGHTS: [f64; 5] = [0.4, 0.3, 0.15, 0.1, 0.05];

/// Two-sided critical t-value at the 95% level for moderate sample sizes.
const T_CRITICAL_95: f64 = 1.96;

/// Pearson correlation coefficient. Returns 0.0 for fewer than two points
/// or when either series has zero variance.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "correlation requires series of equal length");
    if x.len() < 2 {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

/// Ordinary least squares fit of y on x.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    assert_eq!(x.len(), y.len(), "linear regression requires series of equal length");
    if x.len() < 2 {
        return Regression::default();
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        cov += (xi - mean_x) * (yi - mean_y);
        var_x += (xi - mean_x) * (xi - mean_x);
    }
    if var_x == 0.0 {
        return Regression::default();
    }
    let slope = cov / var_x;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let fitted = slope * xi + intercept;
        ss_res += (yi - fitted) * (yi - fitted);
        ss_tot += (yi - mean_y) * (yi - mean_y);
    }
    let r_squared = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    Regression {
        slope,
        intercept,
        r_squared,
    }
}

/// Mean, median, population standard deviation, min and max.
/// Empty input yields the all-zero struct.
pub fn basic_stats(data: &[f64]) -> BasicStats {
    if data.is_empty() {
        return BasicStats::default();
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    let sorted = sorted_copy(data);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    BasicStats {
        mean,
        median,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}

/// Nearest-rank percentiles at index `floor(n * p / 100)` of the sorted
/// data, clamped to valid range. Empty input yields no entries.
pub fn percentiles(data: &[f64], ps: &[u8]) -> Vec<Percentile> {
    if data.is_empty() {
        return Vec::new();
    }
    let sorted = sorted_copy(data);
    ps.iter()
        .map(|&p| {
            let idx = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            Percentile {
                p,
                value: sorted[idx],
            }
        })
        .collect()
}

/// Exponentially decayed average; index 0 carries the highest weight.
pub fn weighted_average(values: &[f64], decay: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, v) in values.iter().enumerate() {
        let w = (-(i as f64) * decay).exp();
        num += w * v;
        den += w;
    }
    num / den
}

/// Population standard deviation over at most the first `window` values.
/// Fewer than three values yields the 0.0 insufficient-data sentinel.
pub fn consistency(scores: &[f64], window: usize) -> f64 {
    if scores.len() < 3 {
        return 0.0;
    }
    let take = scores.len().min(window.max(1));
    basic_stats(&scores[..take]).std_dev
}

/// 100 * std dev / mean; zero mean yields 0.0.
pub fn coefficient_of_variation(data: &[f64]) -> f64 {
    let stats = basic_stats(data);
    if stats.mean == 0.0 {
        return 0.0;
    }
    100.0 * stats.std_dev / stats.mean
}

pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (value - mean) / std_dev
}

/// Percentage of values strictly below `value`, rounded to an integer.
pub fn percentile_rank(value: f64, data: &[f64]) -> u8 {
    if data.is_empty() {
        return 0;
    }
    let below = data.iter().filter(|&&v| v < value).count();
    (below as f64 / data.len() as f64 * 100.0).round() as u8
}

/// Tukey IQR rule with quartiles at `floor(n * 0.25)` and `floor(n * 0.75)`
/// of the sorted data.
pub fn detect_outliers(data: &[f64]) -> Outliers {
    if data.is_empty() {
        return Outliers::default();
    }
    let sorted = sorted_copy(data);
    let q1 = sorted[(sorted.len() * 25 / 100).min(sorted.len() - 1)];
    let q3 = sorted[(sorted.len() * 75 / 100).min(sorted.len() - 1)];
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;
    Outliers {
        outliers: data
            .iter()
            .copied()
            .filter(|v| *v < lower_bound || *v > upper_bound)
            .collect(),
        lower_bound,
        upper_bound,
    }
}

/// Trailing moving average; the window shrinks at the start of the series.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &data[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Projects the next value of a series. `Weighted` blends the most recent
/// five values with fixed decaying weights; `Linear` evaluates the OLS fit
/// at the next index. Fewer than three points yields the last value, or
/// 0.0 for an empty series.
pub fn project_next_value(data: &[f64], method: Projection) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    if data.len() < 3 {
        return data[data.len() - 1];
    }
    match method {
        Projection::Weighted => {
            let mut num = 0.0;
            let mut den = 0.0;
            for (i, v) in data.iter().rev().take(PROJECTION_WEIGHTS.len()).enumerate() {
                num += PROJECTION_WEIGHTS[i] * v;
                den += PROJECTION_WEIGHTS[i];
            }
            num / den
        }
        Projection::Linear => {
            let x: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
            let fit = linear_regression(&x, data);
            fit.slope * data.len() as f64 + fit.intercept
        }
    }
}

/// t-test on a Pearson correlation: true when the correlation is unlikely
/// to be noise at the 95% level. Fewer than three points is never
/// significant.
pub fn significant_correlation(r: f64, n: usize) -> bool {
    if n < 3 {
        return false;
    }
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return true;
    }
    let t = r.abs() * ((n - 2) as f64 / denom).sqrt();
    t > T_CRITICAL_95
}

fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn correlation_of_series_with_itself_is_one() {
        let x = vec![1.0, 2.0, 4.0, 8.0];
        assert!(close(correlation(&x, &x), 1.0));
    }

    #[test]
    fn correlation_against_constant_is_zero() {
        let x = vec![1.0, 2.0, 3.0];
        let flat = vec![5.0, 5.0, 5.0];
        assert_eq!(correlation(&x, &flat), 0.0);
        assert_eq!(correlation(&flat, &x), 0.0);
    }

    #[test]
    fn correlation_with_too_few_points_is_zero() {
        assert_eq!(correlation(&[1.0], &[2.0]), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn correlation_rejects_mismatched_lengths() {
        correlation(&[1.0, 2.0], &[1.0]);
    }

    #[test]
    fn regression_recovers_exact_line() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 3.0, 5.0, 7.0];
        let fit = linear_regression(&x, &y);
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));
        assert!(close(fit.r_squared, 1.0));
    }

    #[test]
    fn regression_on_flat_series_has_full_fit() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![4.0, 4.0, 4.0];
        let fit = linear_regression(&x, &y);
        assert!(close(fit.slope, 0.0));
        assert!(close(fit.r_squared, 1.0));
    }

    #[test]
    fn regression_degenerate_input_is_zeroed() {
        assert_eq!(linear_regression(&[1.0], &[2.0]), Regression::default());
        let fit = linear_regression(&[2.0, 2.0, 2.0], &[1.0, 5.0, 9.0]);
        assert_eq!(fit, Regression::default());
    }

    #[test]
    fn basic_stats_orders_min_mean_max() {
        let data = vec![7.0, 5.5, 8.2, 6.1, 4.9];
        let stats = basic_stats(&data);
        assert!(stats.std_dev >= 0.0);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(close(stats.median, 6.1));
    }

    #[test]
    fn basic_stats_empty_is_zeroed() {
        assert_eq!(basic_stats(&[]), BasicStats::default());
    }

    #[test]
    fn basic_stats_uses_population_std_dev() {
        let stats = basic_stats(&[2.0, 4.0]);
        assert!(close(stats.std_dev, 1.0));
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let data: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let ps = percentiles(&data, &DEFAULT_PERCENTILES);
        assert_eq!(ps.len(), 5);
        // index floor(10 * 50 / 100) = 5 -> sixth element
        assert!(close(ps[2].value, 6.0));
        // index floor(10 * 90 / 100) = 9 -> last element
        assert!(close(ps[4].value, 10.0));
    }

    #[test]
    fn weighted_average_handles_edges() {
        assert!(close(weighted_average(&[10.0], 0.1), 10.0));
        assert_eq!(weighted_average(&[], 0.1), 0.0);
    }

    #[test]
    fn weighted_average_favors_leading_values() {
        let front_heavy = weighted_average(&[9.0, 5.0, 5.0], 0.5);
        let back_heavy = weighted_average(&[5.0, 5.0, 9.0], 0.5);
        assert!(front_heavy > back_heavy);
    }

    #[test]
    fn consistency_needs_three_points() {
        assert_eq!(consistency(&[5.0, 6.0], CONSISTENCY_WINDOW), 0.0);
        assert!(consistency(&[5.0, 6.0, 7.0], CONSISTENCY_WINDOW) > 0.0);
    }

    #[test]
    fn consistency_caps_at_window() {
        let mut scores = vec![5.0; 10];
        scores.extend([0.0, 10.0]);
        // first ten values are flat, so the windowed std dev is zero
        assert_eq!(consistency(&scores, 10), 0.0);
    }

    #[test]
    fn coefficient_of_variation_guards_zero_mean() {
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0]), 0.0);
        assert!(coefficient_of_variation(&[4.0, 6.0]) > 0.0);
    }

    #[test]
    fn z_score_guards_zero_std_dev() {
        assert_eq!(z_score(5.0, 3.0, 0.0), 0.0);
        assert!(close(z_score(5.0, 3.0, 1.0), 2.0));
    }

    #[test]
    fn percentile_rank_counts_strictly_below() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_rank(3.0, &data), 50);
        assert_eq!(percentile_rank(0.5, &data), 0);
        assert_eq!(percentile_rank(9.0, &data), 100);
        assert_eq!(percentile_rank(3.0, &[]), 0);
    }

    #[test]
    fn outliers_follow_tukey_bounds() {
        let mut data: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        data.push(100.0);
        let found = detect_outliers(&data);
        assert_eq!(found.outliers, vec![100.0]);
        assert!(found.lower_bound < 1.0);
        assert!(found.upper_bound < 100.0);
    }

    #[test]
    fn moving_average_shrinks_leading_window() {
        let data = vec![2.0, 4.0, 6.0, 8.0];
        let averages = moving_average(&data, 3);
        assert!(close(averages[0], 2.0));
        assert!(close(averages[1], 3.0));
        assert!(close(averages[2], 4.0));
        assert!(close(averages[3], 6.0));
    }

    #[test]
    fn projection_short_series_returns_last_value() {
        assert_eq!(project_next_value(&[], Projection::Weighted), 0.0);
        assert!(close(project_next_value(&[4.0, 6.0], Projection::Weighted), 6.0));
    }

    #[test]
    fn weighted_projection_blends_recent_values() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let expected = 0.4 * 6.0 + 0.3 * 5.0 + 0.15 * 4.0 + 0.1 * 3.0 + 0.05 * 2.0;
        assert!(close(project_next_value(&data, Projection::Weighted), expected));
    }

    #[test]
    fn weighted_projection_normalizes_short_tail() {
        let data = vec![6.0, 6.0, 6.0];
        assert!(close(project_next_value(&data, Projection::Weighted), 6.0));
    }

    #[test]
    fn linear_projection_extends_the_fit() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert!(close(project_next_value(&data, Projection::Linear), 5.0));
    }

    #[test]
    fn correlation_significance_needs_sample_size() {
        assert!(!significant_correlation(0.99, 2));
        assert!(!significant_correlation(0.3, 10));
        assert!(significant_correlation(0.9, 10));
        assert!(significant_correlation(1.0, 3));
    }
}
