//! JSON export of batch regression results

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::batch::{BatchReport, EntryStatus};
use crate::config::AnalysisConfig;
use crate::pipeline::{ModelBundle, RegressionSpec, ReplicationType};

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub jkreg_version: String,
    pub input_file: String,
    pub weight_prefix: String,
    pub replicates: usize,
    pub replication_type: String,
    pub confidence: f64,
}

impl RunMetadata {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            jkreg_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: config.input.display().to_string(),
            weight_prefix: config.weight_prefix.clone(),
            replicates: config.replicates,
            replication_type: ReplicationType::Jk1.to_string(),
            confidence: config.confidence,
        }
    }
}

#[derive(Serialize)]
pub struct ExportEntry<'a> {
    #[serde(flatten)]
    pub spec: &'a RegressionSpec,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a ModelBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BatchExport<'a> {
    pub metadata: RunMetadata,
    pub fitted: usize,
    pub not_fitted: usize,
    pub results: Vec<ExportEntry<'a>>,
}

/// Build the export document for a report
pub fn build_export<'a>(report: &'a BatchReport, metadata: RunMetadata) -> BatchExport<'a> {
    let results = report
        .entries
        .iter()
        .map(|entry| ExportEntry {
            spec: &entry.spec,
            status: entry.status(),
            model: entry.result.as_ref().ok(),
            error: entry.result.as_ref().err().map(|e| e.to_string()),
        })
        .collect();

    BatchExport {
        metadata,
        fitted: report.succeeded(),
        not_fitted: report.failed(),
        results,
    }
}

/// Write batch results to a JSON file
pub fn export_batch_json(report: &BatchReport, path: &Path, metadata: RunMetadata) -> Result<()> {
    let export = build_export(report, metadata);
    let json = serde_json::to_string_pretty(&export).context("Failed to serialize results")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
    Ok(())
}
