//! Dataset loader for CSV and Parquet survey extracts

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::utils::{create_spinner, finish_with_success};

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset lazily (CSV or Parquet based on extension).
///
/// `infer_schema_length` applies to CSV only; 0 scans the whole file.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension_of(path).as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        other => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            other
        ),
    };

    Ok(lf)
}

/// Column names from the file schema without reading the data
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let mut lf = load_dataset(path, 10_000)?;
    let schema = lf
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;
    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}

/// Load and collect a dataset behind a spinner.
///
/// Returns the frame, row count, column count and estimated size in MB.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let lf = load_dataset(path, infer_schema_length)?;

    let spinner = create_spinner("Loading dataset...");
    let df = lf
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {} rows × {} columns", rows, cols));

    tracing::debug!(rows, cols, memory_mb, path = %path.display(), "dataset loaded");
    Ok((df, rows, cols, memory_mb))
}
