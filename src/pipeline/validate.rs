//! Hold-out validation of the regression models.
//!
//! The split is stratified over the four superhost-by-room cells so the
//! test set always contains every cell. Three models are compared: an
//! additive base model (superhost + room, no interaction), the extended
//! model with the interaction, neighbourhood and review-count controls
//! plus bucketed review dummies, and the extended model on log price with
//! predictions mapped back to euros before scoring.

use anyhow::{bail, Result};
use faer::Mat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::design::{build_design, DesignConfig, DesignMatrix};
use super::groups::{category_premiums, premium_gap_pp};
use super::listing::{GroupKey, Listing, RoomCategory};
use crate::stats::{fit_ols, mean, std_dev, LinearFit};

/// Train/test R-squared gap beyond which a model is flagged as overfit.
pub const R_SQUARED_GAP_LIMIT: f64 = 0.05;
/// Train/test RMSE gap, in euros, beyond which a model is flagged.
pub const RMSE_GAP_LIMIT: f64 = 20.0;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { test_fraction: 0.3, seed: 42 }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
    pub mape_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub train: ModelMetrics,
    pub test: ModelMetrics,
    pub overfit_r_squared: bool,
    pub overfit_rmse: bool,
}

/// Train-vs-full divergence of one category's superhost premium.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDivergence {
    pub room: RoomCategory,
    pub full_premium_pct: Option<f64>,
    pub train_premium_pct: Option<f64>,
    pub divergence_pp: Option<f64>,
}

/// Premiums recomputed on the training subset against the full sample.
///
/// The per-category divergences catch unrepresentative splits whose
/// category errors offset each other in the combined gap.
#[derive(Debug, Clone, Serialize)]
pub struct PremiumCheck {
    pub categories: Vec<CategoryDivergence>,
    pub full_gap_pp: Option<f64>,
    pub train_gap_pp: Option<f64>,
    pub divergence_pp: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub train_n: usize,
    pub test_n: usize,
    pub models: Vec<ModelReport>,
    pub premium_check: PremiumCheck,
}

/// Stratified split over the grid cells.
///
/// Fatal when any cell is too small to land on both sides, since every
/// model term would otherwise be unidentified on one side.
pub fn stratified_split(
    listings: &[Listing],
    config: &SplitConfig,
) -> Result<(Vec<Listing>, Vec<Listing>)> {
    if !(0.0..1.0).contains(&config.test_fraction) || config.test_fraction == 0.0 {
        bail!("Test fraction must lie strictly inside (0, 1), got {}", config.test_fraction);
    }
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (cell_idx, key) in GroupKey::ALL.iter().enumerate() {
        let mut cell: Vec<&Listing> = listings.iter().filter(|l| l.group() == *key).collect();
        let n = cell.len();
        let test_n = ((n as f64) * config.test_fraction).round() as usize;
        if n < 2 || test_n == 0 || test_n == n {
            bail!(
                "The {} / {} cell has {} listings and cannot occupy both split sides",
                key.host_label(),
                key.room.label(),
                n
            );
        }
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(cell_idx as u64));
        cell.shuffle(&mut rng);
        for (i, l) in cell.into_iter().enumerate() {
            if i < test_n {
                test.push(l.clone());
            } else {
                train.push(l.clone());
            }
        }
    }
    Ok((train, test))
}

fn score(pred: &[f64], actual: &[f64]) -> ModelMetrics {
    let n = actual.len() as f64;
    let rmse = (pred
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let mae = pred.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum::<f64>() / n;
    let mape_pct =
        100.0 * pred.iter().zip(actual).map(|(p, a)| ((p - a) / a).abs()).sum::<f64>() / n;
    let r_squared = match (std_dev(pred), std_dev(actual)) {
        (Some(sp), Some(sa)) if sp > 0.0 && sa > 0.0 => {
            let mp = mean(pred).unwrap_or(0.0);
            let ma = mean(actual).unwrap_or(0.0);
            let cov = pred
                .iter()
                .zip(actual)
                .map(|(p, a)| (p - mp) * (a - ma))
                .sum::<f64>()
                / (n - 1.0);
            (cov / (sp * sa)).powi(2)
        }
        _ => 0.0,
    };
    ModelMetrics { rmse, mae, r_squared, mape_pct }
}

fn encode_set(design: &DesignMatrix, listings: &[Listing], columns: &[usize]) -> Mat<f64> {
    let rows: Vec<Vec<f64>> = listings
        .iter()
        .map(|l| design.encode_row(l.superhost, l.room, &l.neighbourhood, l.reviews))
        .collect();
    Mat::from_fn(listings.len(), columns.len(), |i, j| rows[i][columns[j]])
}

/// Coarse review-count bins: none, 1-9, 10-49, 50 and up.
fn review_bucket(reviews: u32) -> usize {
    match reviews {
        0 => 0,
        1..=9 => 1,
        10..=49 => 2,
        _ => 3,
    }
}

/// Full design row plus one dummy per non-reference review bucket.
///
/// Buckets unseen in training carry no dummy, so a test listing landing
/// in one folds into the reference level.
fn encode_extended(
    design: &DesignMatrix,
    listings: &[Listing],
    dummy_levels: &[usize],
) -> Mat<f64> {
    let rows: Vec<Vec<f64>> = listings
        .iter()
        .map(|l| {
            let mut row = design.encode_row(l.superhost, l.room, &l.neighbourhood, l.reviews);
            let bucket = review_bucket(l.reviews);
            for level in dummy_levels {
                row.push(if bucket == *level { 1.0 } else { 0.0 });
            }
            row
        })
        .collect();
    Mat::from_fn(listings.len(), design.p() + dummy_levels.len(), |i, j| rows[i][j])
}

fn report(
    name: &str,
    fit: &LinearFit,
    x_train: &Mat<f64>,
    y_train: &[f64],
    x_test: &Mat<f64>,
    y_test: &[f64],
    back_transform: bool,
) -> ModelReport {
    let mut pred_train = fit.predict(x_train);
    let mut pred_test = fit.predict(x_test);
    if back_transform {
        for p in pred_train.iter_mut().chain(pred_test.iter_mut()) {
            *p = p.exp() - 1.0;
        }
    }
    let train = score(&pred_train, y_train);
    let test = score(&pred_test, y_test);
    ModelReport {
        name: name.to_string(),
        overfit_r_squared: train.r_squared - test.r_squared > R_SQUARED_GAP_LIMIT,
        overfit_rmse: test.rmse - train.rmse > RMSE_GAP_LIMIT,
        train,
        test,
    }
}

/// Split, fit, and score the three models.
pub fn validate_models(
    listings: &[Listing],
    split_config: &SplitConfig,
    design_config: &DesignConfig,
) -> Result<ValidationReport> {
    let (train, test) = stratified_split(listings, split_config)?;

    // the encoding, including the bucket levels, is fitted on the
    // training subset only
    let design = build_design(&train, design_config)?;
    let base_columns: Vec<usize> = ["intercept", "superhost", "private_room"]
        .iter()
        .filter_map(|name| design.column_index(name))
        .collect();
    let mut bucket_levels: Vec<usize> = train.iter().map(|l| review_bucket(l.reviews)).collect();
    bucket_levels.sort_unstable();
    bucket_levels.dedup();
    // the lowest observed bucket is the reference level
    let dummy_levels: Vec<usize> = bucket_levels.into_iter().skip(1).collect();

    let y_train: Vec<f64> = train.iter().map(|l| l.price).collect();
    let y_test: Vec<f64> = test.iter().map(|l| l.price).collect();
    let y_train_log: Vec<f64> = y_train.iter().map(|p| (p + 1.0).ln()).collect();

    let x_train_base = encode_set(&design, &train, &base_columns);
    let x_test_base = encode_set(&design, &test, &base_columns);
    let x_train_full = encode_extended(&design, &train, &dummy_levels);
    let x_test_full = encode_extended(&design, &test, &dummy_levels);

    let base_fit = fit_ols(&x_train_base, &y_train)?;
    let extended_fit = fit_ols(&x_train_full, &y_train)?;
    let log_fit = fit_ols(&x_train_full, &y_train_log)?;

    let models = vec![
        report("base", &base_fit, &x_train_base, &y_train, &x_test_base, &y_test, false),
        report("extended", &extended_fit, &x_train_full, &y_train, &x_test_full, &y_test, false),
        report("log_price", &log_fit, &x_train_full, &y_train, &x_test_full, &y_test, true),
    ];

    let full_premiums = category_premiums(listings);
    let train_premiums = category_premiums(&train);
    let categories: Vec<CategoryDivergence> = full_premiums
        .iter()
        .map(|full| {
            let train_pct = train_premiums
                .iter()
                .find(|t| t.room == full.room)
                .and_then(|t| t.premium_pct);
            let divergence_pp = match (full.premium_pct, train_pct) {
                (Some(f), Some(t)) => Some((f - t).abs()),
                _ => None,
            };
            CategoryDivergence {
                room: full.room,
                full_premium_pct: full.premium_pct,
                train_premium_pct: train_pct,
                divergence_pp,
            }
        })
        .collect();
    let full_gap_pp = premium_gap_pp(&full_premiums);
    let train_gap_pp = premium_gap_pp(&train_premiums);
    let divergence_pp = match (full_gap_pp, train_gap_pp) {
        (Some(full), Some(tr)) => Some((full - tr).abs()),
        _ => None,
    };

    Ok(ValidationReport {
        train_n: train.len(),
        test_n: test.len(),
        models,
        premium_check: PremiumCheck { categories, full_gap_pp, train_gap_pp, divergence_pp },
    })
}
