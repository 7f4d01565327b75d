//! Small numeric helpers shared by the metrics engine.
//!
//! Every helper returns `None` instead of NaN when its result is not defined,
//! so callers never have to guess whether a value was computed.

/// `values[i] / values[i - lag] - 1` for every `i >= lag`, `None` before that.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if lag == 0 || i < lag {
                return None;
            }
            ratio_minus_one(values[i], values[i - lag])
        })
        .collect()
}

/// `numerator / denominator - 1`, undefined for a zero or non-finite result.
pub fn ratio_minus_one(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    finite(numerator / denominator - 1.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (`n - 1` denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    sample_covariance(values, values)
}

/// Sample standard deviation (`n - 1` denominator).
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(|v| v.max(0.0).sqrt())
}

/// Sample covariance of two equally long series (`n - 1` denominator).
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    finite(sum / (xs.len() - 1) as f64)
}

/// Drawdown from the running maximum at every position. Always `<= 0`.
pub fn running_drawdown(values: &[f64]) -> Vec<Option<f64>> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v > peak {
                peak = v;
            }
            if peak <= 0.0 || !peak.is_finite() {
                return None;
            }
            // The peak dominates `v`, so the numerator is never positive.
            finite((v - peak) / peak).map(|d| d.min(0.0))
        })
        .collect()
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn pct_change_leaves_warm_up_undefined() {
        let r = pct_change(&[100.0, 102.0, 101.0], 1);
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - 0.02).abs() < EPS);
        assert!((r[2].unwrap() - (101.0 / 102.0 - 1.0)).abs() < EPS);
        assert!(pct_change(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn zero_denominator_is_undefined_not_infinite() {
        assert_eq!(ratio_minus_one(1.0, 0.0), None);
    }

    #[test]
    fn sample_statistics_use_n_minus_one() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population variance is 4.0; the sample variance is 32 / 7.
        assert!((sample_variance(&xs).unwrap() - 32.0 / 7.0).abs() < EPS);
        assert!((sample_std_dev(&xs).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < EPS);
        assert_eq!(sample_variance(&[1.0]), None);
    }

    #[test]
    fn covariance_requires_matching_lengths() {
        assert_eq!(sample_covariance(&[1.0, 2.0], &[1.0]), None);
        let c = sample_covariance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((c - 2.0).abs() < EPS);
    }

    #[test]
    fn drawdown_is_zero_at_new_highs() {
        let dd = running_drawdown(&[100.0, 102.0, 101.0, 105.0, 103.0]);
        assert_eq!(dd[0], Some(0.0));
        assert_eq!(dd[1], Some(0.0));
        assert!((dd[2].unwrap() - (101.0 - 102.0) / 102.0).abs() < EPS);
        assert_eq!(dd[3], Some(0.0));
    }
}
