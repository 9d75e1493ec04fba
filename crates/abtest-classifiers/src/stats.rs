//! Statistical primitives for A/B test plots.
//!
//! Everything here is a pure function of sample sizes, the base conversion
//! rate (`bcr`) of the control group and the effect size (`d_hat`, the
//! difference in conversion rate of the test group). The returned values are
//! what a plot of the null and alternative distributions needs; rendering is
//! left to the caller.
use serde::Serialize;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{ModelingError, Result};

/// Which hypothesis a distribution describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Null hypothesis, centred on zero.
    Control,
    /// Alternative hypothesis, centred on `d_hat`.
    Test,
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal> {
    Normal::new(mean, std_dev).map_err(|e| {
        ModelingError::InvalidStatistic(format!("normal({}, {}): {}", mean, std_dev, e))
    })
}

fn check_sizes(n_a: f64, n_b: f64) -> Result<()> {
    if !(n_a > 0.0 && n_b > 0.0) {
        return Err(ModelingError::InvalidStatistic(format!(
            "sample sizes must be positive, got {} and {}",
            n_a, n_b
        )));
    }
    Ok(())
}

/// Conversion probability of both groups combined.
pub fn pooled_probability(n_a: f64, n_b: f64, x_a: f64, x_b: f64) -> Result<f64> {
    check_sizes(n_a, n_b)?;
    Ok((x_a + x_b) / (n_a + n_b))
}

/// Pooled standard error of the difference in conversion rate, where `x_a`
/// and `x_b` are the conversions observed in groups of size `n_a` and `n_b`.
pub fn pooled_standard_error(n_a: f64, n_b: f64, x_a: f64, x_b: f64) -> Result<f64> {
    let p_hat = pooled_probability(n_a, n_b, x_a, x_b)?;
    if !(0.0..=1.0).contains(&p_hat) {
        return Err(ModelingError::InvalidStatistic(format!(
            "pooled probability {} lies outside [0, 1]",
            p_hat
        )));
    }
    Ok((p_hat * (1.0 - p_hat) * (1.0 / n_a + 1.0 / n_b)).sqrt())
}

/// Critical z value of the standard normal for a significance level.
pub fn z_value(sig_level: f64, two_tailed: bool) -> Result<f64> {
    if !(sig_level > 0.0 && sig_level < 1.0) {
        return Err(ModelingError::InvalidStatistic(format!(
            "significance level {} must lie in (0, 1)",
            sig_level
        )));
    }
    let area = if two_tailed { 1.0 - sig_level / 2.0 } else { 1.0 - sig_level };
    Ok(normal(0.0, 1.0)?.inverse_cdf(area))
}

/// Two-sided confidence interval around a sample mean.
pub fn confidence_interval(
    sample_mean: f64,
    sample_std: f64,
    sample_size: f64,
    sig_level: f64,
) -> Result<(f64, f64)> {
    if sample_size <= 0.0 {
        return Err(ModelingError::InvalidStatistic(format!(
            "sample size must be positive, got {}",
            sample_size
        )));
    }
    let z = z_value(sig_level, true)?;
    let half_width = z * sample_std / sample_size.sqrt();
    Ok((sample_mean - half_width, sample_mean + half_width))
}

/// Sampling distribution of the difference under the null (`Control`) or the
/// alternative (`Test`) hypothesis.
pub fn ab_distribution(stderr: f64, d_hat: f64, group: Group) -> Result<Normal> {
    match group {
        Group::Control => normal(0.0, stderr),
        Group::Test => normal(d_hat, stderr),
    }
}

/// Two-sided p-value of a two-proportion z-test for conversion rates `bcr`
/// and `bcr + d_hat` observed on `n_a` and `n_b` samples.
pub fn p_value(n_a: f64, n_b: f64, bcr: f64, d_hat: f64) -> Result<f64> {
    let x_a = bcr * n_a;
    let x_b = (bcr + d_hat) * n_b;
    let stderr = pooled_standard_error(n_a, n_b, x_a, x_b)?;
    if stderr == 0.0 {
        return Ok(if d_hat == 0.0 { 1.0 } else { 0.0 });
    }
    let z = d_hat / stderr;
    Ok(2.0 * (1.0 - normal(0.0, 1.0)?.cdf(z.abs())))
}

/// Everything a plot of one A/B test shows.
#[derive(Debug, Clone, Serialize)]
pub struct AbTestSummary {
    pub stderr: f64,
    pub d_hat: f64,
    pub sig_level: f64,
    /// Critical z value (two-tailed).
    pub z_critical: f64,
    /// Difference above which the null is rejected, `z_critical * stderr`.
    pub rejection_threshold: f64,
    pub power: f64,
    pub beta: f64,
    pub p_value: f64,
    #[serde(skip)]
    pub null: Normal,
    #[serde(skip)]
    pub alternative: Normal,
}

impl AbTestSummary {
    pub fn new(n_a: f64, n_b: f64, bcr: f64, d_hat: f64, sig_level: f64) -> Result<Self> {
        let stderr = pooled_standard_error(n_a, n_b, bcr * n_a, (bcr + d_hat) * n_b)?;
        let null = ab_distribution(stderr, d_hat, Group::Control)?;
        let alternative = ab_distribution(stderr, d_hat, Group::Test)?;
        let z_critical = z_value(sig_level, true)?;
        let rejection_threshold = z_critical * stderr;
        let beta = alternative.cdf(rejection_threshold);
        log::debug!(
            "A/B summary: stderr {:.5}, threshold {:.5}, power {:.4}",
            stderr,
            rejection_threshold,
            1.0 - beta
        );
        Ok(AbTestSummary {
            stderr,
            d_hat,
            sig_level,
            z_critical,
            rejection_threshold,
            power: 1.0 - beta,
            beta,
            p_value: p_value(n_a, n_b, bcr, d_hat)?,
            null,
            alternative,
        })
    }

    /// Null density at zero, where a plot places the p-value annotation.
    pub fn null_peak(&self) -> f64 {
        self.null.pdf(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn pooled_standard_error_matches_formula() {
        let se = pooled_standard_error(1000.0, 1000.0, 100.0, 120.0).unwrap();
        let p: f64 = 0.11;
        assert!(close(se, (p * (1.0 - p) * 0.002).sqrt(), 1e-12));
        assert!(pooled_standard_error(0.0, 10.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn critical_z_values() {
        assert!(close(z_value(0.05, true).unwrap(), 1.959964, 1e-5));
        assert!(close(z_value(0.05, false).unwrap(), 1.644854, 1e-5));
        assert!(z_value(0.0, true).is_err());
    }

    #[test]
    fn confidence_interval_is_symmetric() {
        let (lo, hi) = confidence_interval(0.0, 1.0, 1.0, 0.05).unwrap();
        assert!(close(lo, -hi, 1e-12));
        assert!(close(hi, 1.959964, 1e-5));
    }

    #[test]
    fn distributions_are_centred_by_group() {
        let control = ab_distribution(0.01, 0.02, Group::Control).unwrap();
        let test = ab_distribution(0.01, 0.02, Group::Test).unwrap();
        assert!(close(control.cdf(0.0), 0.5, 1e-12));
        assert!(close(test.cdf(0.02), 0.5, 1e-12));
        assert!(ab_distribution(0.0, 0.02, Group::Test).is_err());
    }

    #[test]
    fn p_value_shrinks_with_sample_size() {
        let small = p_value(100.0, 100.0, 0.1, 0.02).unwrap();
        let large = p_value(10_000.0, 10_000.0, 0.1, 0.02).unwrap();
        assert!(large < small);
        assert!(close(p_value(500.0, 500.0, 0.2, 0.0).unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn summary_power_and_beta_sum_to_one() {
        let summary = AbTestSummary::new(4000.0, 4000.0, 0.11, 0.03, 0.05).unwrap();
        assert!(close(summary.power + summary.beta, 1.0, 1e-12));
        assert!(summary.power > 0.9);
        assert!(summary.p_value < 0.05);
        assert!(summary.null_peak() > 0.0);
    }
}
