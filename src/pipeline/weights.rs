//! Replicate-weight column lists, validation and extraction

use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;

use super::error::{AnalysisError, AnalysisResult};

/// Named full-sample weight and its jackknife replicates.
///
/// Columns are identified by name, never by position, so a reordered or
/// truncated extract is caught by [`ReplicateWeights::validate`] instead of
/// silently corrupting variance estimates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicateWeights {
    pub primary: String,
    pub replicates: Vec<String>,
    /// Replicate count the design was configured with
    pub expected: usize,
}

impl ReplicateWeights {
    /// Build `{prefix}0` plus `{prefix}1 ..= {prefix}{count}`.
    ///
    /// The longitudinal file names its weights this way, e.g. `W9C9P_20`
    /// with replicates `W9C9P_21` through `W9C9P_280`.
    pub fn from_prefix(prefix: &str, count: usize) -> Self {
        Self {
            primary: format!("{}0", prefix),
            replicates: (1..=count).map(|i| format!("{}{}", prefix, i)).collect(),
            expected: count,
        }
    }

    /// Build from explicit names
    pub fn new(primary: impl Into<String>, replicates: Vec<String>, expected: usize) -> Self {
        Self {
            primary: primary.into(),
            replicates,
            expected,
        }
    }

    pub fn len(&self) -> usize {
        self.replicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicates.is_empty()
    }

    /// Primary followed by replicates
    pub fn all_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.replicates.iter().map(|s| s.as_str()))
    }

    /// Check the list against the expected count and the frame's columns
    pub fn validate(&self, df: &DataFrame) -> AnalysisResult<()> {
        if self.replicates.len() != self.expected {
            return Err(AnalysisError::ReplicateMismatch {
                expected: self.expected,
                found: self.replicates.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.replicates.len() + 1);
        for name in self.all_columns() {
            if !seen.insert(name) {
                return Err(AnalysisError::ReplicateMismatch {
                    expected: self.expected,
                    found: seen.len(),
                });
            }
        }

        if let Some(missing) = self.all_columns().find(|c| df.column(c).is_err()) {
            return Err(AnalysisError::MissingColumn(missing.to_string()));
        }

        Ok(())
    }
}

/// Extract a weight column as `f64`, rejecting negative, NaN and infinite values.
///
/// Nulls are returned as `None`; the complete-case step decides what to do
/// with them.
pub fn get_weights(df: &DataFrame, column: &str) -> AnalysisResult<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| AnalysisError::MissingColumn(column.to_string()))?
        .cast(&DataType::Float64)?;

    col.f64()?
        .into_iter()
        .map(|opt| match opt {
            Some(w) if w.is_nan() => Err(invalid(column, "NaN", w)),
            Some(w) if w.is_infinite() => Err(invalid(column, "infinite", w)),
            Some(w) if w < 0.0 => Err(invalid(column, "negative", w)),
            other => Ok(other),
        })
        .collect()
}

fn invalid(column: &str, reason: &'static str, value: f64) -> AnalysisError {
    AnalysisError::InvalidWeight {
        column: column.to_string(),
        reason,
        value,
    }
}

/// Calculate the total weight (sum of all weights).
#[inline]
pub fn total_weight(weights: &[f64]) -> f64 {
    weights.iter().sum()
}
