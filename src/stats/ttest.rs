//! Welch's two-sample t-test and Cohen's d effect size.
//!
//! Welch's test is used throughout the pipeline precisely because the price
//! distributions of Superhost and regular listings have no reason to share a
//! variance. Equal-variance pooling only appears inside Cohen's d, where the
//! pooled-SD convention is standard.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::describe::{mean, variance};
use super::error::{StatsError, StatsResult};

/// Interpretation bucket for |d| per Cohen's conventional thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    /// Bucket an effect size by absolute value.
    pub fn from_d(d: f64) -> Self {
        let a = d.abs();
        if a < 0.2 {
            EffectSize::Negligible
        } else if a < 0.5 {
            EffectSize::Small
        } else if a < 0.8 {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            EffectSize::Negligible => "negligible",
            EffectSize::Small => "small",
            EffectSize::Medium => "medium",
            EffectSize::Large => "large",
        }
    }
}

/// Result of a two-sided Welch's t-test comparing sample A against sample B.
#[derive(Debug, Clone, Serialize)]
pub struct WelchTest {
    pub mean_a: f64,
    pub mean_b: f64,
    /// `mean_a - mean_b`
    pub mean_diff: f64,
    pub t_statistic: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
    pub p_value: f64,
    /// Confidence interval on the mean difference
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub conf_level: f64,
    /// Cohen's d under the pooled-SD convention
    pub cohen_d: f64,
    pub effect: EffectSize,
    pub n_a: usize,
    pub n_b: usize,
}

/// Two-sided Welch's t-test (unequal variances) on two samples.
///
/// Fails fast below 2 observations in either arm: a t-test there is
/// undefined and a degenerate result would poison downstream tables.
pub fn welch_t_test(a: &[f64], b: &[f64], conf_level: f64) -> StatsResult<WelchTest> {
    if a.len() < 2 {
        return Err(StatsError::InsufficientSample {
            test: "Welch's t-test (sample A)",
            required: 2,
            actual: a.len(),
        });
    }
    if b.len() < 2 {
        return Err(StatsError::InsufficientSample {
            test: "Welch's t-test (sample B)",
            required: 2,
            actual: b.len(),
        });
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { context: "Welch's t-test input" });
    }
    if !(conf_level > 0.0 && conf_level < 1.0) {
        return Err(StatsError::InvalidParameter(format!(
            "conf_level must be in (0,1), got {conf_level}"
        )));
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (m_a, m_b) = (mean(a).unwrap(), mean(b).unwrap());
    let (v_a, v_b) = (variance(a).unwrap(), variance(b).unwrap());

    let se_a = v_a / n_a;
    let se_b = v_b / n_b;
    let se = (se_a + se_b).sqrt();
    if se == 0.0 {
        return Err(StatsError::NonFinite {
            context: "Welch's t-test standard error (zero variance in both arms)",
        });
    }

    let mean_diff = m_a - m_b;
    let t = mean_diff / se;

    // Welch-Satterthwaite approximation
    let df = (se_a + se_b).powi(2) / (se_a * se_a / (n_a - 1.0) + se_b * se_b / (n_b - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| StatsError::InvalidParameter(format!("t distribution: {e}")))?;
    let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));
    let t_crit = dist.inverse_cdf(1.0 - (1.0 - conf_level) / 2.0);

    // Pooled-SD Cohen's d
    let pooled_var = ((n_a - 1.0) * v_a + (n_b - 1.0) * v_b) / (n_a + n_b - 2.0);
    let cohen_d = if pooled_var > 0.0 { mean_diff / pooled_var.sqrt() } else { 0.0 };

    Ok(WelchTest {
        mean_a: m_a,
        mean_b: m_b,
        mean_diff,
        t_statistic: t,
        df,
        p_value,
        ci_lower: mean_diff - t_crit * se,
        ci_upper: mean_diff + t_crit * se,
        conf_level,
        cohen_d,
        effect: EffectSize::from_d(cohen_d),
        n_a: a.len(),
        n_b: b.len(),
    })
}
