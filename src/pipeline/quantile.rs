//! Quantile regression across the price distribution.
//!
//! Fits pinball-loss regressions at a ladder of quantiles by iteratively
//! reweighted least squares, with an OLS fit at the mean as the baseline.
//! Standard errors come from a row bootstrap, seeded the same way as the
//! premium bootstrap so a run is reproducible end to end.

use anyhow::{Context, Result};
use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use super::design::DesignMatrix;
use super::listing::RoomCategory;
use crate::stats::{fit_ols, solve_wls, std_dev, LinearFit, StatsError, StatsResult};

/// Residual magnitude floor in the IRLS weight update.
const RESIDUAL_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct QuantileConfig {
    pub taus: Vec<f64>,
    pub max_iter: usize,
    pub tol: f64,
    pub bootstrap_iterations: usize,
    pub seed: u64,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            taus: vec![0.25, 0.50, 0.75, 0.90],
            max_iter: 50,
            tol: 1e-8,
            bootstrap_iterations: 500,
            seed: 42,
        }
    }
}

/// One converged (or iteration-capped) pinball fit.
#[derive(Debug, Clone, Serialize)]
pub struct QuantileFit {
    pub tau: f64,
    pub coef: Vec<f64>,
    /// Bootstrap standard errors; `None` when the bootstrap is disabled
    pub std_err: Option<Vec<f64>>,
    pub iterations: usize,
    pub converged: bool,
}

/// Superhost premium implied by one quantile fit, by room category.
///
/// Absolute premiums come from the coefficients (superhost for entire
/// places, superhost plus interaction for private rooms); percent premiums
/// divide by the predicted regular-host price at the representative
/// covariates (reference neighbourhood, mean review count).
#[derive(Debug, Clone, Serialize)]
pub struct QuantilePremium {
    pub tau: f64,
    pub entire_premium: f64,
    pub private_premium: f64,
    pub entire_premium_pct: f64,
    pub private_premium_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantileAnalysis {
    pub columns: Vec<String>,
    pub fits: Vec<QuantileFit>,
    pub premiums: Vec<QuantilePremium>,
    /// OLS coefficients at the mean, for comparison against the ladder
    pub ols_coef: Vec<f64>,
    pub ols_std_err: Vec<f64>,
    /// The mean-regression baseline, premium computed the same way;
    /// its `tau` is NaN since a mean fit has no quantile level
    pub ols_premium: QuantilePremium,
    /// Whether the category's predicted prices rise with the quantile
    /// level at the representative rows; false means the fitted quantile
    /// curves cross
    pub entire_monotone: bool,
    pub private_monotone: bool,
}

fn pinball_weights(residuals: &[f64], tau: f64) -> Vec<f64> {
    residuals
        .iter()
        .map(|r| {
            let magnitude = r.abs().max(RESIDUAL_FLOOR);
            if *r >= 0.0 {
                tau / magnitude
            } else {
                (1.0 - tau) / magnitude
            }
        })
        .collect()
}

/// Pinball-loss fit at quantile `tau` by iteratively reweighted least squares.
pub fn fit_quantile(
    x: &Mat<f64>,
    y: &[f64],
    tau: f64,
    max_iter: usize,
    tol: f64,
) -> StatsResult<QuantileFit> {
    if !(0.0..1.0).contains(&tau) || tau == 0.0 {
        return Err(StatsError::InvalidParameter(format!(
            "quantile level must lie strictly inside (0, 1), got {tau}"
        )));
    }

    // OLS start: unit weights
    let mut coef = solve_wls(x, y, &vec![1.0; y.len()])?;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;
        let residuals: Vec<f64> = (0..y.len())
            .map(|i| y[i] - (0..x.ncols()).map(|j| coef[j] * x[(i, j)]).sum::<f64>())
            .collect();
        let weights = pinball_weights(&residuals, tau);
        let next = solve_wls(x, y, &weights)?;
        let delta = coef
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        coef = next;
        if delta < tol {
            converged = true;
            break;
        }
    }

    Ok(QuantileFit { tau, coef, std_err: None, iterations, converged })
}

fn resample_rows(
    x: &Mat<f64>,
    y: &[f64],
    rng: &mut StdRng,
) -> (Mat<f64>, Vec<f64>) {
    let n = y.len();
    let idx: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let xs = Mat::from_fn(n, x.ncols(), |i, j| x[(idx[i], j)]);
    let ys = idx.iter().map(|&i| y[i]).collect();
    (xs, ys)
}

fn bootstrap_std_err(
    x: &Mat<f64>,
    y: &[f64],
    tau: f64,
    config: &QuantileConfig,
) -> Option<Vec<f64>> {
    if config.bootstrap_iterations == 0 {
        return None;
    }
    let replicates: Vec<Vec<f64>> = (0..config.bootstrap_iterations)
        .into_par_iter()
        .filter_map(|i| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let (xs, ys) = resample_rows(x, y, &mut rng);
            // resamples that hit a singular design are dropped
            fit_quantile(&xs, &ys, tau, config.max_iter, config.tol)
                .ok()
                .map(|fit| fit.coef)
        })
        .collect();
    if replicates.len() < 2 {
        return None;
    }
    let p = x.ncols();
    let se = (0..p)
        .map(|j| {
            let column: Vec<f64> = replicates.iter().map(|c| c[j]).collect();
            std_dev(&column).unwrap_or(0.0)
        })
        .collect();
    Some(se)
}

/// Predicted prices at the four representative rows, indexed by room
/// (entire place first) and superhost status.
fn predicted_grid(design: &DesignMatrix, coef: &[f64]) -> [[f64; 2]; 2] {
    let mut predicted = [[f64::NAN; 2]; 2];
    for (superhost, room, row) in design.representative_rows() {
        let pred: f64 = row.iter().zip(coef).map(|(x, b)| x * b).sum();
        let r = matches!(room, RoomCategory::PrivateRoom) as usize;
        predicted[r][superhost as usize] = pred;
    }
    predicted
}

/// Crossing check over grids ordered by ascending tau: predicted prices at
/// a fixed covariate row must not fall as the quantile level rises. Both
/// host types of the category must hold.
fn prices_non_decreasing(grids: &[[[f64; 2]; 2]], room: usize) -> bool {
    (0..2).all(|s| grids.windows(2).all(|w| w[1][room][s] >= w[0][room][s]))
}

/// Premium implied by one predicted-price grid.
fn premium_from(predicted: &[[f64; 2]; 2], tau: f64) -> QuantilePremium {
    let pct = |reg: f64, sup: f64| {
        if reg > 0.0 {
            100.0 * (sup - reg) / reg
        } else {
            f64::NAN
        }
    };
    QuantilePremium {
        tau,
        entire_premium: predicted[0][1] - predicted[0][0],
        private_premium: predicted[1][1] - predicted[1][0],
        entire_premium_pct: pct(predicted[0][0], predicted[0][1]),
        private_premium_pct: pct(predicted[1][0], predicted[1][1]),
    }
}

/// Fit the quantile ladder plus the OLS baseline over a design.
pub fn quantile_analysis(
    design: &DesignMatrix,
    config: &QuantileConfig,
) -> Result<QuantileAnalysis> {
    if design.column_index("superhost").is_none()
        || design.column_index("superhost_x_private").is_none()
    {
        anyhow::bail!("Design is missing the superhost indicator or its room interaction");
    }

    let mut taus = config.taus.clone();
    taus.sort_by(|a, b| a.total_cmp(b));

    let mut fits = Vec::with_capacity(taus.len());
    for &tau in &taus {
        let mut fit = fit_quantile(&design.x, &design.y, tau, config.max_iter, config.tol)
            .with_context(|| format!("Quantile fit at tau={tau} failed"))?;
        fit.std_err = bootstrap_std_err(&design.x, &design.y, tau, config);
        fits.push(fit);
    }

    let ols: LinearFit =
        fit_ols(&design.x, &design.y).context("Baseline OLS fit failed")?;

    let grids: Vec<[[f64; 2]; 2]> =
        fits.iter().map(|f| predicted_grid(design, &f.coef)).collect();
    let premiums: Vec<QuantilePremium> =
        fits.iter().zip(&grids).map(|(f, g)| premium_from(g, f.tau)).collect();
    let ols_premium = premium_from(&predicted_grid(design, &ols.coef), f64::NAN);

    Ok(QuantileAnalysis {
        columns: design.columns.clone(),
        fits,
        premiums,
        ols_coef: ols.coef,
        ols_std_err: ols.std_err,
        ols_premium,
        entire_monotone: prices_non_decreasing(&grids, 0),
        private_monotone: prices_non_decreasing(&grids, 1),
    })
}
