//! Error types for reduction and regression.
//!
//! Every variant is local to a single call: the batch driver records the
//! error for one subgroup and keeps going with the rest.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while building the analytic table or fitting a subgroup model.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No usable rows remain after the subpopulation filter and complete-case drop.
    #[error("insufficient sample for this subgroup: {rows} row(s) for {coefficients} coefficient(s) ({detail})")]
    InsufficientSample {
        rows: usize,
        coefficients: usize,
        detail: String,
    },

    /// Replicate-weight block does not match the expected design.
    #[error("replicate weight block mismatch: expected {expected} replicate column(s), found {found}")]
    ReplicateMismatch { expected: usize, found: usize },

    /// A column the analysis needs is absent.
    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),

    /// Casting a column to Float64 turned non-null values into nulls.
    #[error("column '{column}' is not numeric: {count} value(s) could not be cast to Float64")]
    NonNumericColumn { column: String, count: usize },

    /// The identifier column repeats a respondent.
    #[error("identifier column '{column}' has {count} duplicate value(s)")]
    DuplicateIdentifier { column: String, count: usize },

    /// Grade index outside the static wave table.
    #[error("unknown grade index {index}: expected 0..{available}")]
    UnknownGrade { index: usize, available: usize },

    /// Normal equations could not be factorized.
    #[error("singular design matrix in {fit}")]
    SingularDesign { fit: String },

    /// The design has too few replicates for the number of coefficients.
    #[error("no residual degrees of freedom: design df {design_df}, {coefficients} coefficient(s)")]
    InsufficientDegreesOfFreedom { design_df: usize, coefficients: usize },

    /// A weight value that cannot be used.
    #[error("weight column '{column}' contains {reason} value: {value}")]
    InvalidWeight {
        column: String,
        reason: &'static str,
        value: f64,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl AnalysisError {
    /// True for the "insufficient sample" family, which the report shows as a skip rather than a failure.
    pub fn is_insufficient_sample(&self) -> bool {
        matches!(self, AnalysisError::InsufficientSample { .. })
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
