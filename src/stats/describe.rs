//! Descriptive statistics over plain `f64` samples.
//!
//! The group summarizer and every test engine build on these primitives, so
//! they live in one place instead of being recomputed per stage.

/// Arithmetic mean. Returns `None` for an empty sample.
pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Unbiased sample variance (n - 1 denominator).
///
/// Returns `None` below 2 observations - an explicit tag, never a silent NaN.
pub fn variance(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some(ss / (xs.len() - 1) as f64)
}

/// Sample standard deviation. `None` below 2 observations.
pub fn std_dev(xs: &[f64]) -> Option<f64> {
    variance(xs).map(f64::sqrt)
}

/// Standard error of the mean. `None` below 2 observations.
pub fn std_error(xs: &[f64]) -> Option<f64> {
    std_dev(xs).map(|s| s / (xs.len() as f64).sqrt())
}

/// Quantile of sorted data via linear interpolation.
///
/// - `q=0` returns the minimum, `q=1` the maximum
/// - empty input returns `NaN`
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Quantile via sorting + linear interpolation.
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut v = xs.to_vec();
    v.sort_by(f64::total_cmp);
    quantile_sorted(&v, q)
}

/// Median (0.5 quantile).
pub fn median(xs: &[f64]) -> f64 {
    quantile(xs, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance_known_values() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&xs).unwrap() - 5.0).abs() < 1e-12);
        // Sample variance with n-1 denominator: 32/7
        assert!((variance(&xs).unwrap() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn variance_tagged_none_below_two() {
        assert!(variance(&[1.0]).is_none());
        assert!(variance(&[]).is_none());
        assert!(std_dev(&[42.0]).is_none());
    }

    #[test]
    fn quantile_edges_and_interpolation() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile(&xs, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile(&xs, 1.0) - 5.0).abs() < 1e-12);
        assert!((quantile(&xs, 0.5) - 3.0).abs() < 1e-12);
        assert!((quantile(&xs, 0.25) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quantile_unsorted_input() {
        let xs = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((median(&xs) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn quantile_empty_is_nan() {
        assert!(quantile(&[], 0.5).is_nan());
    }
}
