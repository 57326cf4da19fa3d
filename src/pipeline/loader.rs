//! Raw listings loader for CSV and Parquet files.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

/// Load a raw listings table from a file (CSV or Parquet based on extension).
///
/// `infer_schema_length` bounds CSV type inference; 0 scans the whole file.
pub fn load_listings(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let infer = if infer_schema_length == 0 { None } else { Some(infer_schema_length) };
    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(infer)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to materialize dataset: {}", path.display()))
}
