//! Hostprem: Superhost Price Premium CLI Tool
//!
//! A command-line tool for quantifying how the superhost price premium
//! differs between private rooms and entire places, with bootstrap
//! uncertainty, quantile regression, and hold-out validation.

mod cli;
mod pipeline;
mod report;
mod stats;
mod utils;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use pipeline::{
    bootstrap_category_premiums, bootstrap_premium_gap, build_design, category_premiums,
    category_tests, clean_listings, cleaned_frame, load_listings, premium_gap_test,
    quantile_analysis, segment_analysis, summarize_groups, validate_models,
    BootstrapConfig, CleaningConfig, CleaningMode, DesignConfig, QuantileConfig, SplitConfig,
};
use report::{
    bootstrap_frame, group_summary_frame, hypothesis_frame, interaction_frame, premium_frame,
    quantile_coefficient_frame, quantile_frame, run_metadata, segment_frame, validation_frame,
    write_csv, AnalysisSummary, RunManifest,
};
use utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_info, print_step_header, print_step_time, print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let out_dir = cli.out_dir();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &cli.input,
        &out_dir,
        cli.mode.label(),
        cli.seed,
        cli.bootstrap_iterations,
    );

    // Step 1: Load and clean
    print_step_header(1, "Load & Clean Listings");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading listings...");
    let raw = load_listings(&cli.input, cli.infer_schema_length)?;
    finish_with_success(&spinner, &format!("Loaded {} raw listings", raw.height()));

    let cleaning_config = CleaningConfig { mode: cli.mode, ..Default::default() };
    let (listings, cleaning_report) = clean_listings(&raw, &cleaning_config)?;
    print_success(&format!(
        "{} listings retained within [{:.0}, {:.0}] EUR",
        cleaning_report.rows_out, cleaning_report.lower_bound, cleaning_report.upper_bound
    ));
    let dropped = cleaning_report.rows_in - cleaning_report.rows_out;
    if dropped > 0 {
        print_info(&format!(
            "Dropped {} rows ({} missing, {} unparsable price, {} other room types, {} outliers)",
            dropped,
            cleaning_report.dropped_missing,
            cleaning_report.dropped_unparsable_price,
            cleaning_report.dropped_room_type,
            cleaning_report.dropped_below_floor + cleaning_report.dropped_outlier
        ));
    }
    write_csv(&mut cleaned_frame(&listings)?, &out_dir.join("cleaned_listings.csv"))?;
    print_step_time(step_start.elapsed());

    // Step 2: Group summaries and raw premiums
    print_step_header(2, "Group Summaries");
    let step_start = Instant::now();
    let summaries = summarize_groups(&listings);
    let premiums = category_premiums(&listings);
    for summary in &summaries {
        if !summary.adequate_sample {
            print_warning(&format!(
                "The {} / {} cell has only {} listings",
                summary.key.host_label(),
                summary.key.room.label(),
                summary.count
            ));
        }
    }
    write_csv(&mut group_summary_frame(&summaries)?, &out_dir.join("group_summary.csv"))?;
    print_success("Group summaries written");
    print_step_time(step_start.elapsed());

    // Step 3: Hypothesis tests
    print_step_header(3, "Hypothesis Tests");
    let step_start = Instant::now();
    let tests = category_tests(&listings, cli.conf_level);
    let gap_test = premium_gap_test(&listings, cli.conf_level);
    for test in &tests {
        if let Some(reason) = &test.skipped_reason {
            print_warning(&format!("{}: test skipped, {}", test.room.display(), reason));
        }
    }
    match &gap_test.test {
        Some(welch) => print_success(&format!(
            "Premium gap {:+.1} pp (t = {:.2}, p = {:.2e})",
            gap_test.gap_pp, welch.t_statistic, welch.p_value
        )),
        None => print_warning("Headline gap test skipped"),
    }
    print_step_time(step_start.elapsed());

    // Step 4: Bootstrap intervals
    print_step_header(4, "Bootstrap Intervals");
    let step_start = Instant::now();
    let bootstrap_config = BootstrapConfig {
        iterations: cli.bootstrap_iterations,
        seed: cli.seed,
        conf_level: cli.conf_level,
    };
    let spinner = create_spinner("Resampling premiums...");
    let gap_bootstrap = bootstrap_premium_gap(&listings, &bootstrap_config)?;
    let premium_bootstraps = bootstrap_category_premiums(&listings, &bootstrap_config)?;
    finish_with_success(
        &spinner,
        &format!(
            "Gap {:.0}% CI [{:+.1}, {:+.1}] pp over {} replicates",
            cli.conf_level * 100.0,
            gap_bootstrap.ci_lower,
            gap_bootstrap.ci_upper,
            gap_bootstrap.iterations
        ),
    );
    write_csv(
        &mut premium_frame(&premiums, &premium_bootstraps)?,
        &out_dir.join("premiums.csv"),
    )?;
    write_csv(
        &mut hypothesis_frame(&tests, &gap_test, &gap_bootstrap)?,
        &out_dir.join("hypothesis_tests.csv"),
    )?;
    let mut all_bootstraps = premium_bootstraps.clone();
    all_bootstraps.push(gap_bootstrap.clone());
    write_csv(&mut bootstrap_frame(&all_bootstraps)?, &out_dir.join("bootstrap_summary.csv"))?;
    print_step_time(step_start.elapsed());

    // Step 5: Quantile regression, on the relaxed cleaning so the upper
    // tail being modeled is actually in the sample
    print_step_header(5, "Quantile Regression");
    let step_start = Instant::now();
    let relaxed_config =
        CleaningConfig { mode: CleaningMode::Relaxed, ..Default::default() };
    let (tail_listings, _) = clean_listings(&raw, &relaxed_config)?;
    let design_config = DesignConfig { top_neighbourhoods: cli.top_neighbourhoods };
    let design = build_design(&tail_listings, &design_config)?;
    let quantile_config = QuantileConfig {
        bootstrap_iterations: cli.quantile_bootstrap,
        seed: cli.seed,
        ..Default::default()
    };
    let spinner = create_spinner("Fitting the quantile ladder...");
    let quantiles = quantile_analysis(&design, &quantile_config)?;
    if quantiles.fits.iter().all(|f| f.converged) {
        finish_with_success(&spinner, "Quantile ladder fitted");
    } else {
        finish_with_warning(&spinner, "Some quantile fits hit the iteration cap");
    }
    if !quantiles.entire_monotone || !quantiles.private_monotone {
        print_warning("Fitted quantile curves cross: predicted prices fall between levels");
    }
    for (superhost, room, row) in design.representative_rows() {
        let predicted: f64 = row.iter().zip(&quantiles.ols_coef).map(|(x, b)| x * b).sum();
        print_info(&format!(
            "OLS price, {} {}: {:.0} EUR",
            if superhost { "superhost" } else { "regular" },
            room.display(),
            predicted
        ));
    }
    write_csv(&mut quantile_frame(&quantiles)?, &out_dir.join("quantile_premiums.csv"))?;
    write_csv(
        &mut quantile_coefficient_frame(&quantiles)?,
        &out_dir.join("quantile_coefficients.csv"),
    )?;
    print_step_time(step_start.elapsed());

    // Step 6: Price segments
    print_step_header(6, "Price Segments");
    let step_start = Instant::now();
    let segments = segment_analysis(&listings, cli.conf_level)?;
    write_csv(&mut segment_frame(&segments)?, &out_dir.join("segments.csv"))?;
    write_csv(&mut interaction_frame(&segments)?, &out_dir.join("interactions.csv"))?;
    if segments.interaction_terms.is_none() {
        print_warning("Three-way interaction model could not be fit on this sample");
    }
    print_success("Segment premiums written");
    print_step_time(step_start.elapsed());

    // Step 7: Hold-out validation
    print_step_header(7, "Hold-out Validation");
    let step_start = Instant::now();
    let split_config = SplitConfig { test_fraction: cli.test_fraction, seed: cli.seed };
    let validation = validate_models(&listings, &split_config, &design_config)?;
    write_csv(&mut validation_frame(&validation)?, &out_dir.join("validation.csv"))?;
    for model in &validation.models {
        if model.overfit_r_squared || model.overfit_rmse {
            print_warning(&format!("Model '{}' shows a train/test gap", model.name));
        }
    }
    for cat in &validation.premium_check.categories {
        if let Some(divergence) = cat.divergence_pp {
            if divergence > 2.0 {
                print_warning(&format!(
                    "{} premium drifts {:.1} pp between train and full sample",
                    cat.room.display(),
                    divergence
                ));
            }
        }
    }
    print_success(&format!(
        "Validated on {} train / {} test listings",
        validation.train_n, validation.test_n
    ));
    print_step_time(step_start.elapsed());

    // Step 8: Manifest and summary
    print_step_header(8, "Write Manifest");
    let step_start = Instant::now();
    let metadata = run_metadata(
        &cli.input,
        cli.seed,
        cli.bootstrap_iterations,
        cli.quantile_bootstrap,
        cli.conf_level,
        cli.test_fraction,
        cli.top_neighbourhoods,
    );
    let manifest = RunManifest::new(
        metadata,
        cleaning_report.clone(),
        premiums.clone(),
        gap_test.clone(),
        gap_bootstrap.clone(),
        validation.clone(),
    );
    manifest.write(&out_dir.join("run_manifest.json"))?;
    print_success(&format!("Manifest written to {}", out_dir.display()));
    print_step_time(step_start.elapsed());

    AnalysisSummary {
        cleaning: &cleaning_report,
        premiums: &premiums,
        gap_test: &gap_test,
        gap_bootstrap: &gap_bootstrap,
        segments: &segments,
        validation: &validation,
    }
    .display();

    print_completion();

    Ok(())
}
