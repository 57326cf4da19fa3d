//! Result tables written as CSV artifacts.
//!
//! Each stage's findings are flattened into a DataFrame with one row per
//! reported unit so downstream notebooks can consume the run without
//! parsing console output.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::pipeline::{
    BootstrapSummary, CategoryHypothesis, GroupSummary, PremiumGapTest, PremiumSummary,
    QuantileAnalysis, SegmentAnalysis, ValidationReport,
};

/// Write a result table as CSV, creating the parent directory if needed.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// One row per superhost-by-room cell.
pub fn group_summary_frame(summaries: &[GroupSummary]) -> Result<DataFrame> {
    let df = df! {
        "host_type" => summaries.iter().map(|s| s.key.host_label()).collect::<Vec<_>>(),
        "room_category" => summaries.iter().map(|s| s.key.room.label()).collect::<Vec<_>>(),
        "count" => summaries.iter().map(|s| s.count as i64).collect::<Vec<_>>(),
        "mean" => summaries.iter().map(|s| s.mean).collect::<Vec<_>>(),
        "median" => summaries.iter().map(|s| s.median).collect::<Vec<_>>(),
        "sd" => summaries.iter().map(|s| s.sd).collect::<Vec<_>>(),
        "se" => summaries.iter().map(|s| s.se).collect::<Vec<_>>(),
        "q1" => summaries.iter().map(|s| s.q1).collect::<Vec<_>>(),
        "q3" => summaries.iter().map(|s| s.q3).collect::<Vec<_>>(),
        "adequate_sample" => summaries.iter().map(|s| s.adequate_sample).collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// One row per room category, raw premiums next to their bootstrap interval.
pub fn premium_frame(
    premiums: &[PremiumSummary],
    bootstraps: &[BootstrapSummary],
) -> Result<DataFrame> {
    let interval = |room_label: &str| {
        bootstraps
            .iter()
            .find(|b| b.statistic.ends_with(room_label))
    };
    let df = df! {
        "room_category" => premiums.iter().map(|p| p.room.label()).collect::<Vec<_>>(),
        "superhost_mean" => premiums.iter().map(|p| p.superhost_mean).collect::<Vec<_>>(),
        "regular_mean" => premiums.iter().map(|p| p.regular_mean).collect::<Vec<_>>(),
        "superhost_n" => premiums.iter().map(|p| p.superhost_n as i64).collect::<Vec<_>>(),
        "regular_n" => premiums.iter().map(|p| p.regular_n as i64).collect::<Vec<_>>(),
        "premium_abs" => premiums.iter().map(|p| p.premium_abs).collect::<Vec<_>>(),
        "premium_pct" => premiums.iter().map(|p| p.premium_pct).collect::<Vec<_>>(),
        "premium_ratio" => premiums.iter().map(|p| p.premium_ratio).collect::<Vec<_>>(),
        "adequate_sample" => premiums.iter().map(|p| p.adequate_sample).collect::<Vec<_>>(),
        "boot_ci_lower" => premiums
            .iter()
            .map(|p| interval(p.room.label()).map(|b| b.ci_lower))
            .collect::<Vec<_>>(),
        "boot_ci_upper" => premiums
            .iter()
            .map(|p| interval(p.room.label()).map(|b| b.ci_upper))
            .collect::<Vec<_>>(),
        "boot_p_value" => premiums
            .iter()
            .map(|p| interval(p.room.label()).map(|b| b.p_value))
            .collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// One row per bootstrapped statistic.
pub fn bootstrap_frame(summaries: &[BootstrapSummary]) -> Result<DataFrame> {
    let df = df! {
        "statistic" => summaries.iter().map(|b| b.statistic.clone()).collect::<Vec<_>>(),
        "observed" => summaries.iter().map(|b| b.observed).collect::<Vec<_>>(),
        "boot_mean" => summaries.iter().map(|b| b.boot_mean).collect::<Vec<_>>(),
        "se" => summaries.iter().map(|b| b.se).collect::<Vec<_>>(),
        "ci_lower" => summaries.iter().map(|b| b.ci_lower).collect::<Vec<_>>(),
        "ci_upper" => summaries.iter().map(|b| b.ci_upper).collect::<Vec<_>>(),
        "p_value" => summaries.iter().map(|b| b.p_value).collect::<Vec<_>>(),
        "iterations" => summaries.iter().map(|b| b.iterations as i64).collect::<Vec<_>>(),
        "seed" => summaries.iter().map(|b| b.seed as i64).collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// Per-category Welch tests plus the headline gap test, one row each.
pub fn hypothesis_frame(
    tests: &[CategoryHypothesis],
    gap: &PremiumGapTest,
    gap_bootstrap: &BootstrapSummary,
) -> Result<DataFrame> {
    let mut comparison = Vec::new();
    let mut n_a = Vec::new();
    let mut n_b = Vec::new();
    let mut mean_diff = Vec::new();
    let mut t_stat = Vec::new();
    let mut dfree = Vec::new();
    let mut p_value = Vec::new();
    let mut ci_lower = Vec::new();
    let mut ci_upper = Vec::new();
    let mut cohen_d = Vec::new();
    let mut effect = Vec::new();
    let mut skipped = Vec::new();

    let mut push = |name: String, a: usize, b: usize, test: &Option<crate::stats::WelchTest>,
                    reason: &Option<String>| {
        comparison.push(name);
        n_a.push(a as i64);
        n_b.push(b as i64);
        mean_diff.push(test.as_ref().map(|t| t.mean_diff));
        t_stat.push(test.as_ref().map(|t| t.t_statistic));
        dfree.push(test.as_ref().map(|t| t.df));
        p_value.push(test.as_ref().map(|t| t.p_value));
        ci_lower.push(test.as_ref().map(|t| t.ci_lower));
        ci_upper.push(test.as_ref().map(|t| t.ci_upper));
        cohen_d.push(test.as_ref().map(|t| t.cohen_d));
        effect.push(test.as_ref().map(|t| t.effect.label().to_string()));
        skipped.push(reason.clone());
    };

    for t in tests {
        push(
            format!("superhost_vs_regular_{}", t.room.label()),
            t.superhost_n,
            t.regular_n,
            &t.test,
            &t.skipped_reason,
        );
    }
    push(
        "premium_gap_private_vs_entire".to_string(),
        gap.private_n,
        gap.entire_n,
        &gap.test,
        &gap.skipped_reason,
    );

    let rows = comparison.len();
    let df = df! {
        "comparison" => comparison,
        "n_a" => n_a,
        "n_b" => n_b,
        "mean_diff" => mean_diff,
        "t_statistic" => t_stat,
        "df" => dfree,
        "p_value" => p_value,
        "ci_lower" => ci_lower,
        "ci_upper" => ci_upper,
        "cohen_d" => cohen_d,
        "effect_size" => effect,
        "skipped_reason" => skipped,
        "boot_ci_lower" => (0..rows)
            .map(|i| (i == rows - 1).then_some(gap_bootstrap.ci_lower))
            .collect::<Vec<_>>(),
        "boot_ci_upper" => (0..rows)
            .map(|i| (i == rows - 1).then_some(gap_bootstrap.ci_upper))
            .collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// One row per quantile level and room category, with the OLS baseline as
/// the final pair of rows.
pub fn quantile_frame(analysis: &QuantileAnalysis) -> Result<DataFrame> {
    let mut tau = Vec::new();
    let mut room = Vec::new();
    let mut premium = Vec::new();
    let mut premium_pct = Vec::new();
    let mut std_err = Vec::new();
    let mut converged = Vec::new();

    let superhost_idx = analysis.columns.iter().position(|c| c == "superhost");

    let mut push = |t: Option<f64>,
                    p: &crate::pipeline::QuantilePremium,
                    se: Option<f64>,
                    conv: bool| {
        for (label, abs, pct) in [
            ("entire_place", p.entire_premium, p.entire_premium_pct),
            ("private_room", p.private_premium, p.private_premium_pct),
        ] {
            tau.push(t);
            room.push(label);
            premium.push(abs);
            premium_pct.push(pct);
            // the private-room premium combines two coefficients; its
            // bootstrap error is not the sum, so only the direct term
            // carries one here
            std_err.push(if label == "entire_place" { se } else { None });
            converged.push(conv);
        }
    };

    for (fit, p) in analysis.fits.iter().zip(&analysis.premiums) {
        let se = match (superhost_idx, &fit.std_err) {
            (Some(s), Some(errs)) => Some(errs[s]),
            _ => None,
        };
        push(Some(fit.tau), p, se, fit.converged);
    }
    let ols_se = superhost_idx.map(|s| analysis.ols_std_err[s]);
    push(None, &analysis.ols_premium, ols_se, true);

    let df = df! {
        "tau" => tau,
        "room_category" => room,
        "premium_eur" => premium,
        "premium_pct" => premium_pct,
        "std_err" => std_err,
        "converged" => converged,
    }?;
    Ok(df)
}

/// One coefficient per row for every quantile fit plus the OLS baseline.
pub fn quantile_coefficient_frame(analysis: &QuantileAnalysis) -> Result<DataFrame> {
    let mut model = Vec::new();
    let mut term = Vec::new();
    let mut coef = Vec::new();
    let mut std_err = Vec::new();

    for fit in &analysis.fits {
        for (j, name) in analysis.columns.iter().enumerate() {
            model.push(format!("tau_{}", fit.tau));
            term.push(name.clone());
            coef.push(fit.coef[j]);
            std_err.push(fit.std_err.as_ref().map(|errs| errs[j]));
        }
    }
    for (j, name) in analysis.columns.iter().enumerate() {
        model.push("ols".to_string());
        term.push(name.clone());
        coef.push(analysis.ols_coef[j]);
        std_err.push(Some(analysis.ols_std_err[j]));
    }

    let df = df! {
        "model" => model,
        "term" => term,
        "coef" => coef,
        "std_err" => std_err,
    }?;
    Ok(df)
}

/// Interaction coefficients from the three-way segment regression; an
/// empty frame when the model could not be fit.
pub fn interaction_frame(analysis: &SegmentAnalysis) -> Result<DataFrame> {
    let terms = analysis.interaction_terms.as_deref().unwrap_or(&[]);
    let df = df! {
        "term" => terms.iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
        "coef" => terms.iter().map(|t| t.coef).collect::<Vec<_>>(),
        "std_err" => terms.iter().map(|t| t.std_err).collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// One row per room-by-segment cell.
pub fn segment_frame(analysis: &SegmentAnalysis) -> Result<DataFrame> {
    let cells = &analysis.cells;
    let df = df! {
        "room_category" => cells.iter().map(|c| c.room.label()).collect::<Vec<_>>(),
        "segment" => cells.iter().map(|c| c.segment.label()).collect::<Vec<_>>(),
        "superhost_n" => cells.iter().map(|c| c.superhost_n as i64).collect::<Vec<_>>(),
        "regular_n" => cells.iter().map(|c| c.regular_n as i64).collect::<Vec<_>>(),
        "superhost_mean" => cells.iter().map(|c| c.superhost_mean).collect::<Vec<_>>(),
        "regular_mean" => cells.iter().map(|c| c.regular_mean).collect::<Vec<_>>(),
        "premium_abs" => cells.iter().map(|c| c.premium_abs).collect::<Vec<_>>(),
        "premium_pct" => cells.iter().map(|c| c.premium_pct).collect::<Vec<_>>(),
        "p_value" => cells
            .iter()
            .map(|c| c.test.as_ref().map(|t| t.p_value))
            .collect::<Vec<_>>(),
        "adequate_sample" => cells.iter().map(|c| c.adequate_sample).collect::<Vec<_>>(),
    }?;
    Ok(df)
}

/// One row per validation model and evaluation side.
pub fn validation_frame(report: &ValidationReport) -> Result<DataFrame> {
    let mut model = Vec::new();
    let mut side = Vec::new();
    let mut rmse = Vec::new();
    let mut mae = Vec::new();
    let mut r_squared = Vec::new();
    let mut mape = Vec::new();
    let mut overfit = Vec::new();

    for m in &report.models {
        for (name, metrics) in [("train", &m.train), ("test", &m.test)] {
            model.push(m.name.clone());
            side.push(name);
            rmse.push(metrics.rmse);
            mae.push(metrics.mae);
            r_squared.push(metrics.r_squared);
            mape.push(metrics.mape_pct);
            overfit.push(m.overfit_r_squared || m.overfit_rmse);
        }
    }

    let df = df! {
        "model" => model,
        "side" => side,
        "rmse" => rmse,
        "mae" => mae,
        "r_squared" => r_squared,
        "mape_pct" => mape,
        "overfit_flag" => overfit,
    }?;
    Ok(df)
}
