//! Run configuration, built once at startup and passed by reference

use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::weights::ReplicateWeights;

pub const DEFAULT_ID_COLUMN: &str = "CHILDID";
pub const DEFAULT_WEIGHT_PREFIX: &str = "W9C9P_2";
pub const DEFAULT_REPLICATES: usize = 80;
pub const DEFAULT_POVERTY_COLUMN: &str = "X2POVTY";
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Everything the pipeline needs to know about the input and the design
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    /// Where the reduced analytic table is written
    pub output: PathBuf,
    pub id_column: String,
    /// Full-sample weight is `{prefix}0`, replicates `{prefix}1..={prefix}{replicates}`
    pub weight_prefix: String,
    pub replicates: usize,
    pub poverty_column: String,
    pub confidence: f64,
    pub infer_schema_length: usize,
    /// Optional JSON export of regression results
    pub json_output: Option<PathBuf>,
}

impl AnalysisConfig {
    /// Defaults for the longitudinal kindergarten-to-fifth-grade extract
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            weight_prefix: DEFAULT_WEIGHT_PREFIX.to_string(),
            replicates: DEFAULT_REPLICATES,
            poverty_column: DEFAULT_POVERTY_COLUMN.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            infer_schema_length: 10_000,
            json_output: None,
        }
    }

    pub fn replicate_weights(&self) -> ReplicateWeights {
        ReplicateWeights::from_prefix(&self.weight_prefix, self.replicates)
    }
}
