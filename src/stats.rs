//! Descriptive statistics over a numeric column.
//!
//! All functions return `None` when the statistic is undefined for the input
//! length instead of producing NaN. Finite input near `f64::MAX` never yields
//! an infinite result.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        return Some(sum / n);
    }
    // the running sum overflowed; every v / n is finite and so is their sum
    Some(values.iter().map(|v| v / n).sum())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Root of the summed squared deviations from `center` over `denom`.
///
/// Falls back to scaling by the largest magnitude when the squares overflow.
/// `None` only when the deviation itself exceeds `f64::MAX`.
fn rms_dev(values: &[f64], center: f64, denom: f64) -> Option<f64> {
    let direct = (values.iter().map(|v| (v - center).powi(2)).sum::<f64>() / denom).sqrt();
    if direct.is_finite() {
        return Some(direct);
    }
    let scale = values.iter().fold(center.abs(), |acc, v| acc.max(v.abs()));
    let scaled = values
        .iter()
        .map(|v| (v / scale - center / scale).powi(2))
        .sum::<f64>();
    Some(scale * (scaled / denom).sqrt()).filter(|sd| sd.is_finite())
}

/// Sample standard deviation (n - 1 denominator). Undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_std_about(values, mean(values)?)
}

/// Sample standard deviation about a mean the caller already holds.
pub fn sample_std_about(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    rms_dev(values, mean, (values.len() - 1) as f64)
}

/// Population standard deviation (n denominator). Undefined for empty input.
pub fn population_std(values: &[f64]) -> Option<f64> {
    rms_dev(values, mean(values)?, values.len() as f64)
}

/// Count of values strictly further than `k` population deviations from the mean.
pub fn count_beyond_sigma(values: &[f64], k: f64) -> u64 {
    let (Some(m), Some(sd)) = (mean(values), population_std(values)) else {
        return 0;
    };
    let limit = k * sd;
    values.iter().filter(|v| (*v - m).abs() > limit).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_undefined() {
        assert_eq!(mean(&[]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[]), None);
        assert_eq!(population_std(&[]), None);
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(mean(&[4.5]), Some(4.5));
        assert_eq!(sample_std(&[4.5]), None);
        assert_eq!(population_std(&[4.5]), Some(0.0));
    }

    #[test]
    fn test_known_values() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&vals).unwrap() - 5.0).abs() < 1e-12);
        assert!((population_std(&vals).unwrap() - 2.0).abs() < 1e-12);
        // 32 / 7
        assert!((sample_std(&vals).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(min(&vals), Some(2.0));
        assert_eq!(max(&vals), Some(9.0));
    }

    #[test]
    fn test_negative_values() {
        let vals = [-3.0, 0.0, 3.0];
        assert_eq!(mean(&vals), Some(0.0));
        assert_eq!(min(&vals), Some(-3.0));
        assert_eq!(sample_std(&vals), Some(3.0));
    }

    #[test]
    fn test_two_sigma_boundary_is_not_outlier() {
        // mean 28, population std 36, |100 - 28| == 72 == 2 * 36
        let vals = [10.0, 10.0, 10.0, 10.0, 100.0];
        assert_eq!(population_std(&vals), Some(36.0));
        assert_eq!(count_beyond_sigma(&vals, 2.0), 0);
    }

    #[test]
    fn test_two_sigma_exceeded() {
        // mean 19, population std 27, |100 - 19| = 81 > 54
        let mut vals = vec![10.0; 9];
        vals.push(100.0);
        assert_eq!(count_beyond_sigma(&vals, 2.0), 1);
        assert_eq!(count_beyond_sigma(&[], 2.0), 0);
    }

    #[test]
    fn test_values_near_max_stay_finite() {
        let big = [1e308, 1e308];
        assert_eq!(mean(&big), Some(1e308));
        assert_eq!(population_std(&big), Some(0.0));
        assert_eq!(sample_std(&big), Some(0.0));

        let wide = [1e308, -1e308];
        assert_eq!(mean(&wide), Some(0.0));
        let sd = population_std(&wide).unwrap();
        assert!((sd - 1e308).abs() / 1e308 < 1e-12);

        let lopsided = [1.5e308, 1.5e308, 1.0];
        let m = mean(&lopsided).unwrap();
        assert!(m.is_finite());
        assert!((m - 1e308).abs() / 1e308 < 1e-12);
    }

    #[test]
    fn test_unrepresentable_deviation_is_undefined() {
        // sample std of ±1.7e308 is about 2.4e308
        assert_eq!(sample_std(&[1.7e308, -1.7e308]), None);
    }
}
