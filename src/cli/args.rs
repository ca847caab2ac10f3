//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    AnalysisConfig, DEFAULT_ID_COLUMN, DEFAULT_POVERTY_COLUMN, DEFAULT_WEIGHT_PREFIX,
};

/// jkreg - Weighted regressions with jackknife replicate-weight standard errors
#[derive(Parser, Debug)]
#[command(name = "jkreg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input survey extract (CSV or Parquet)
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// Output path for the reduced analytic table (CSV or Parquet, by extension).
    /// Defaults to the input directory with a '_reduced.csv' suffix.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Respondent identifier column
    #[arg(long, global = true, default_value = DEFAULT_ID_COLUMN)]
    pub id_column: String,

    /// Weight column prefix: '{prefix}0' is the full-sample weight,
    /// '{prefix}1' to '{prefix}{replicates}' the jackknife replicates
    #[arg(long, global = true, default_value = DEFAULT_WEIGHT_PREFIX)]
    pub weight_prefix: String,

    /// Number of jackknife replicate weights the design expects
    #[arg(long, global = true, default_value = "80", value_parser = validate_replicates)]
    pub replicates: usize,

    /// Poverty column; codes 2 and 3 are recoded to 1, everything else to 0
    #[arg(long, global = true, default_value = DEFAULT_POVERTY_COLUMN)]
    pub poverty_column: String,

    /// Confidence level for coefficient intervals
    #[arg(long, global = true, default_value = "0.95", value_parser = validate_confidence)]
    pub confidence: f64,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, global = true, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Write all regression results to this JSON file
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reduce the extract and write the analytic table only
    Reduce,

    /// Fit a single (grade, race, outcome) regression
    Fit {
        /// Grade index: 0 = kindergarten through 5 = fifth grade
        #[arg(short, long)]
        grade: usize,

        /// Race indicator column (e.g. X_BLACK_R, X_HISP_R)
        #[arg(short, long)]
        race: String,

        /// Outcome column (e.g. X2RTHETK5)
        #[arg(long)]
        outcome: String,
    },
}

impl Cli {
    /// Get the input path, if provided.
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let parent = input.parent().unwrap_or_else(|| std::path::Path::new("."));
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_reduced.csv", stem))
        }))
    }

    /// Build the run configuration; `None` when no input was given
    pub fn to_config(&self) -> Option<AnalysisConfig> {
        let input = self.input()?.clone();
        let output = self.output_path()?;
        let mut config = AnalysisConfig::new(input, output);
        config.id_column = self.id_column.clone();
        config.weight_prefix = self.weight_prefix.clone();
        config.replicates = self.replicates;
        config.poverty_column = self.poverty_column.clone();
        config.confidence = self.confidence;
        config.infer_schema_length = self.infer_schema_length;
        config.json_output = self.json.clone();
        Some(config)
    }
}

/// Validator for the confidence level
fn validate_confidence(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("confidence must be between 0 and 1 (exclusive), got {}", value))
    }
}

/// Validator for the replicate count
fn validate_replicates(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value >= 2 {
        Ok(value)
    } else {
        Err(format!("replicates must be at least 2, got {}", value))
    }
}
