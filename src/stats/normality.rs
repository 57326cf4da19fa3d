//! Distributional assumption diagnostics.
//!
//! These checks are informational: the pipeline uses Welch's t-test
//! throughout exactly because it does not require equal variances, and the
//! CLT covers the mean comparisons at the sample sizes involved. The results
//! are recorded alongside each test so a reader can judge the assumptions,
//! but they never gate a test.
//!
//! Shapiro-Wilk follows Royston's AS R94 approximation (valid for
//! 3 <= n <= 5000); above that cutoff the Jarque-Bera statistic is used as
//! the large-sample alternative.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal};

use super::describe::mean;
use super::error::{StatsError, StatsResult};

/// Largest sample size for which the Shapiro-Wilk approximation is valid.
pub const SHAPIRO_WILK_MAX_N: usize = 5000;

/// Significance level for the "assumption met" flags.
const ALPHA: f64 = 0.05;

/// Which normality statistic was computed for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityMethod {
    ShapiroWilk,
    JarqueBera,
}

/// Result of a normality test on a single sample.
#[derive(Debug, Clone, Serialize)]
pub struct NormalityTest {
    pub method: NormalityMethod,
    pub statistic: f64,
    pub p_value: f64,
    /// True when the test fails to reject normality at alpha = 0.05.
    pub assumption_met: bool,
    pub n: usize,
}

/// Result of Levene's variance-homogeneity test on two samples.
#[derive(Debug, Clone, Serialize)]
pub struct LeveneTest {
    pub statistic: f64,
    pub p_value: f64,
    /// True when the test fails to reject equal variances at alpha = 0.05.
    pub assumption_met: bool,
}

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal is constructible")
}

/// Test a sample for normality, selecting Shapiro-Wilk or Jarque-Bera by
/// sample size.
pub fn normality_test(xs: &[f64]) -> StatsResult<NormalityTest> {
    if xs.len() <= SHAPIRO_WILK_MAX_N {
        shapiro_wilk(xs)
    } else {
        jarque_bera(xs)
    }
}

/// Shapiro-Wilk W test via the Royston (1995) AS R94 approximation.
///
/// Requires 3 <= n <= 5000 observations.
pub fn shapiro_wilk(xs: &[f64]) -> StatsResult<NormalityTest> {
    let n = xs.len();
    if n < 3 {
        return Err(StatsError::InsufficientSample {
            test: "Shapiro-Wilk",
            required: 3,
            actual: n,
        });
    }
    if n > SHAPIRO_WILK_MAX_N {
        return Err(StatsError::InvalidParameter(format!(
            "Shapiro-Wilk approximation is only valid up to n={SHAPIRO_WILK_MAX_N}, got {n}"
        )));
    }
    if xs.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { context: "Shapiro-Wilk input" });
    }

    let mut x = xs.to_vec();
    x.sort_by(f64::total_cmp);

    let nf = n as f64;
    let norm = std_normal();

    // Expected normal order statistics (Blom scores)
    let m: Vec<f64> =
        (1..=n).map(|i| norm.inverse_cdf((i as f64 - 0.375) / (nf + 0.25))).collect();
    let ssm: f64 = m.iter().map(|v| v * v).sum();

    let rsn = 1.0 / nf.sqrt();
    let (rsn2, rsn3, rsn4, rsn5) = (rsn * rsn, rsn.powi(3), rsn.powi(4), rsn.powi(5));

    // Royston's polynomial corrections for the outermost coefficients
    let c_n = m[n - 1] / ssm.sqrt();
    let a_n = c_n + 0.221157 * rsn - 0.147981 * rsn2 - 2.071190 * rsn3 + 4.434685 * rsn4
        - 2.706056 * rsn5;

    let mut a = vec![0.0; n];
    if n > 5 {
        let c_n1 = m[n - 2] / ssm.sqrt();
        let a_n1 = c_n1 + 0.042981 * rsn - 0.293762 * rsn2 - 1.752461 * rsn3 + 5.682633 * rsn4
            - 3.582633 * rsn5;
        let phi = (ssm - 2.0 * m[n - 1] * m[n - 1] - 2.0 * m[n - 2] * m[n - 2])
            / (1.0 - 2.0 * a_n * a_n - 2.0 * a_n1 * a_n1);
        a[n - 1] = a_n;
        a[n - 2] = a_n1;
        a[0] = -a_n;
        a[1] = -a_n1;
        for i in 2..n - 2 {
            a[i] = m[i] / phi.sqrt();
        }
    } else {
        let phi = (ssm - 2.0 * m[n - 1] * m[n - 1]) / (1.0 - 2.0 * a_n * a_n);
        a[n - 1] = a_n;
        a[0] = -a_n;
        for i in 1..n - 1 {
            a[i] = m[i] / phi.sqrt();
        }
    }

    let xbar = mean(&x).unwrap();
    let num: f64 = a.iter().zip(x.iter()).map(|(ai, xi)| ai * xi).sum::<f64>().powi(2);
    let den: f64 = x.iter().map(|v| (v - xbar) * (v - xbar)).sum();
    if den == 0.0 {
        return Err(StatsError::NonFinite { context: "Shapiro-Wilk on a constant sample" });
    }
    let w = num / den;

    // Royston's normalizing transformations for the p-value
    let p_value = if n == 3 {
        let stqr = (0.75_f64).sqrt().asin();
        ((6.0 / std::f64::consts::PI) * (w.sqrt().asin() - stqr)).clamp(0.0, 1.0)
    } else if n <= 11 {
        let g = -2.273 + 0.459 * nf;
        let mu = 0.5440 - 0.39978 * nf + 0.025054 * nf * nf - 0.0006714 * nf.powi(3);
        let sigma = (1.3822 - 0.77857 * nf + 0.062767 * nf * nf - 0.0020322 * nf.powi(3)).exp();
        let z = (-(g - (1.0 - w).ln()).ln() - mu) / sigma;
        1.0 - norm.cdf(z)
    } else {
        let ln_n = nf.ln();
        let mu = -1.5861 - 0.31082 * ln_n - 0.083751 * ln_n * ln_n + 0.0038915 * ln_n.powi(3);
        let sigma = (-0.4803 - 0.082676 * ln_n + 0.0030302 * ln_n * ln_n).exp();
        let z = ((1.0 - w).ln() - mu) / sigma;
        1.0 - norm.cdf(z)
    };

    Ok(NormalityTest {
        method: NormalityMethod::ShapiroWilk,
        statistic: w,
        p_value,
        assumption_met: p_value > ALPHA,
        n,
    })
}

/// Jarque-Bera normality test, the large-sample alternative.
pub fn jarque_bera(xs: &[f64]) -> StatsResult<NormalityTest> {
    let n = xs.len();
    if n < 8 {
        return Err(StatsError::InsufficientSample {
            test: "Jarque-Bera",
            required: 8,
            actual: n,
        });
    }
    if xs.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { context: "Jarque-Bera input" });
    }

    let nf = n as f64;
    let m = mean(xs).unwrap();
    let m2: f64 = xs.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    let m3: f64 = xs.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    let m4: f64 = xs.iter().map(|v| (v - m).powi(4)).sum::<f64>() / nf;
    if m2 == 0.0 {
        return Err(StatsError::NonFinite { context: "Jarque-Bera on a constant sample" });
    }

    let skew = m3 / m2.powf(1.5);
    let kurt = m4 / (m2 * m2);
    let jb = nf * (skew * skew / 6.0 + (kurt - 3.0).powi(2) / 24.0);

    let chi2 = ChiSquared::new(2.0)
        .map_err(|e| StatsError::InvalidParameter(format!("chi-squared distribution: {e}")))?;
    let p_value = 1.0 - chi2.cdf(jb);

    Ok(NormalityTest {
        method: NormalityMethod::JarqueBera,
        statistic: jb,
        p_value,
        assumption_met: p_value > ALPHA,
        n,
    })
}

/// Levene's test (mean-centered) for equal variances across two samples.
pub fn levene_test(a: &[f64], b: &[f64]) -> StatsResult<LeveneTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(StatsError::InsufficientSample {
            test: "Levene's test",
            required: 2,
            actual: a.len().min(b.len()),
        });
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { context: "Levene's test input" });
    }

    let n_total = (a.len() + b.len()) as f64;
    let k = 2.0;

    // Absolute deviations from each group mean
    let (ma, mb) = (mean(a).unwrap(), mean(b).unwrap());
    let za: Vec<f64> = a.iter().map(|v| (v - ma).abs()).collect();
    let zb: Vec<f64> = b.iter().map(|v| (v - mb).abs()).collect();

    let (zbar_a, zbar_b) = (mean(&za).unwrap(), mean(&zb).unwrap());
    let zbar = (za.iter().sum::<f64>() + zb.iter().sum::<f64>()) / n_total;

    let between =
        za.len() as f64 * (zbar_a - zbar).powi(2) + zb.len() as f64 * (zbar_b - zbar).powi(2);
    let within: f64 = za.iter().map(|z| (z - zbar_a).powi(2)).sum::<f64>()
        + zb.iter().map(|z| (z - zbar_b).powi(2)).sum::<f64>();
    if within == 0.0 {
        return Err(StatsError::NonFinite {
            context: "Levene's test with zero within-group spread",
        });
    }

    let statistic = ((n_total - k) / (k - 1.0)) * between / within;
    let f_dist = FisherSnedecor::new(k - 1.0, n_total - k)
        .map_err(|e| StatsError::InvalidParameter(format!("F distribution: {e}")))?;
    let p_value = 1.0 - f_dist.cdf(statistic);

    Ok(LeveneTest { statistic, p_value, assumption_met: p_value > ALPHA })
}
