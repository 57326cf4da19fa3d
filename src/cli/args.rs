//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::CleaningMode;

/// Hostprem - Quantify the superhost price premium by room category
#[derive(Parser, Debug)]
#[command(name = "hostprem")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input listings file (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for result tables and the run manifest.
    /// Defaults to '<input directory>/hostprem_out'.
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Outlier policy: "strict" (3-sigma bound) or "relaxed" (hard ceiling).
    /// The quantile stage always re-cleans under the relaxed policy so the
    /// upper tail it models is present.
    #[arg(long, default_value = "strict", value_parser = parse_mode)]
    pub mode: CleaningMode,

    /// Seed for every randomized stage (bootstrap, split)
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Bootstrap replicates for the premium intervals
    #[arg(long, default_value = "1000")]
    pub bootstrap_iterations: usize,

    /// Bootstrap replicates behind the quantile-regression standard errors.
    /// Use 0 to skip those standard errors entirely.
    #[arg(long, default_value = "500")]
    pub quantile_bootstrap: usize,

    /// Number of neighbourhoods kept as regression dummies; the rest fold
    /// into an Other bucket
    #[arg(long, default_value = "10")]
    pub top_neighbourhoods: usize,

    /// Hold-out fraction for model validation
    #[arg(long, default_value = "0.3", value_parser = validate_fraction)]
    pub test_fraction: f64,

    /// Confidence level for every interval and test
    #[arg(long, default_value = "0.95", value_parser = validate_fraction)]
    pub conf_level: f64,

    /// Number of rows to use for schema inference (CSV only)
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Output directory, derived from the input location if not given.
    pub fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| {
            let parent = self.input.parent().unwrap_or_else(|| std::path::Path::new("."));
            parent.join("hostprem_out")
        })
    }
}

fn parse_mode(s: &str) -> Result<CleaningMode, String> {
    match s.to_lowercase().as_str() {
        "strict" => Ok(CleaningMode::Strict),
        "relaxed" => Ok(CleaningMode::Relaxed),
        other => Err(format!("mode must be 'strict' or 'relaxed', got '{}'", other)),
    }
}

/// Validator for fraction-valued parameters
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0 < value && value < 1.0) {
        Err(format!("value must be strictly between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["hostprem", "-i", "listings.csv"]);
        assert_eq!(cli.seed, 42);
        assert_eq!(cli.bootstrap_iterations, 1000);
        assert_eq!(cli.quantile_bootstrap, 500);
        assert_eq!(cli.mode, CleaningMode::Strict);
        assert_eq!(cli.out_dir(), PathBuf::from("hostprem_out"));
    }

    #[test]
    fn mode_parser_accepts_both_policies() {
        let cli = Cli::parse_from(["hostprem", "-i", "l.csv", "--mode", "relaxed"]);
        assert_eq!(cli.mode, CleaningMode::Relaxed);
        assert!(Cli::try_parse_from(["hostprem", "-i", "l.csv", "--mode", "loose"]).is_err());
    }

    #[test]
    fn fractions_outside_the_unit_interval_are_rejected() {
        assert!(Cli::try_parse_from(["hostprem", "-i", "l.csv", "--test-fraction", "1.5"])
            .is_err());
        assert!(Cli::try_parse_from(["hostprem", "-i", "l.csv", "--conf-level", "0"]).is_err());
    }
}
