//! Run manifest export.
//!
//! A single JSON document capturing what was run, on what data, with which
//! knobs, and the headline findings. Reruns with the same input and seed
//! produce an identical manifest apart from the timestamp.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    BootstrapSummary, CleaningReport, PremiumGapTest, PremiumSummary, ValidationReport,
};

/// Metadata about the analysis run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// Hostprem version
    pub hostprem_version: String,
    /// Input file path
    pub input_file: String,
    /// Seed shared by the bootstrap and the validation split
    pub seed: u64,
    pub bootstrap_iterations: usize,
    pub quantile_bootstrap_iterations: usize,
    pub conf_level: f64,
    pub test_fraction: f64,
    pub top_neighbourhoods: usize,
}

/// Headline findings, duplicated from the tables for quick consumption
#[derive(Serialize)]
pub struct HeadlineFindings {
    pub premium_pct_entire_place: Option<f64>,
    pub premium_pct_private_room: Option<f64>,
    pub premium_gap_pp: f64,
    pub gap_p_value: Option<f64>,
    pub gap_boot_ci_lower: f64,
    pub gap_boot_ci_upper: f64,
}

/// Complete run manifest
#[derive(Serialize)]
pub struct RunManifest {
    pub metadata: RunMetadata,
    pub cleaning: CleaningReport,
    pub headline: HeadlineFindings,
    pub premiums: Vec<PremiumSummary>,
    pub gap_test: PremiumGapTest,
    pub gap_bootstrap: BootstrapSummary,
    pub validation: ValidationReport,
}

impl RunManifest {
    pub fn new(
        metadata: RunMetadata,
        cleaning: CleaningReport,
        premiums: Vec<PremiumSummary>,
        gap_test: PremiumGapTest,
        gap_bootstrap: BootstrapSummary,
        validation: ValidationReport,
    ) -> Self {
        let premium_for = |label: &str| {
            premiums
                .iter()
                .find(|p| p.room.label() == label)
                .and_then(|p| p.premium_pct)
        };
        let headline = HeadlineFindings {
            premium_pct_entire_place: premium_for("entire_place"),
            premium_pct_private_room: premium_for("private_room"),
            premium_gap_pp: gap_test.gap_pp,
            gap_p_value: gap_test.test.as_ref().map(|t| t.p_value),
            gap_boot_ci_lower: gap_bootstrap.ci_lower,
            gap_boot_ci_upper: gap_bootstrap.ci_upper,
        };
        Self { metadata, cleaning, headline, premiums, gap_test, gap_bootstrap, validation }
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize the run manifest")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        Ok(())
    }
}

/// Build run metadata with the current timestamp.
pub fn run_metadata(
    input: &Path,
    seed: u64,
    bootstrap_iterations: usize,
    quantile_bootstrap_iterations: usize,
    conf_level: f64,
    test_fraction: f64,
    top_neighbourhoods: usize,
) -> RunMetadata {
    RunMetadata {
        timestamp: Utc::now().to_rfc3339(),
        hostprem_version: env!("CARGO_PKG_VERSION").to_string(),
        input_file: input.display().to_string(),
        seed,
        bootstrap_iterations,
        quantile_bootstrap_iterations,
        conf_level,
        test_fraction,
        top_neighbourhoods,
    }
}
