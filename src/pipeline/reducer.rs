//! Reduction of the raw extract to the analytic table
//!
//! Selects columns by name rules, casts everything to `Float64` (failing on
//! values that do not parse), recodes the poverty indicator to 0/1 and
//! builds a z-scaled copy for standardized coefficients.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::{AnalysisError, AnalysisResult};
use super::waves::{all_measure_columns, RaceGroup};
use super::weights::ReplicateWeights;
use crate::config::AnalysisConfig;

/// Poverty codes recoded to 1
const POVERTY_CODES: [f64; 2] = [2.0, 3.0];

/// A single column-name selection rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRule {
    Exact(String),
    Prefix(String),
}

impl ColumnRule {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ColumnRule::Exact(n) => name == n,
            ColumnRule::Prefix(p) => name.starts_with(p.as_str()),
        }
    }
}

/// Which columns survive reduction
#[derive(Debug, Clone)]
pub struct ColumnSelection {
    pub rules: Vec<ColumnRule>,
    /// Columns that must be present in the input
    pub required: Vec<String>,
}

impl ColumnSelection {
    /// Identifier, weight block, every wave's scales and outcomes, race indicators, poverty
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut rules = vec![
            ColumnRule::Exact(config.id_column.clone()),
            ColumnRule::Prefix(config.weight_prefix.clone()),
        ];
        rules.extend(
            all_measure_columns()
                .into_iter()
                .map(|c| ColumnRule::Exact(c.to_string())),
        );
        rules.extend(
            RaceGroup::ALL
                .iter()
                .map(|r| ColumnRule::Exact(r.column().to_string())),
        );
        rules.push(ColumnRule::Exact(config.poverty_column.clone()));

        let mut required = vec![config.id_column.clone(), config.poverty_column.clone()];
        required.extend(RaceGroup::ALL.iter().map(|r| r.column().to_string()));

        Self { rules, required }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.matches(name))
    }
}

/// Reduced raw table plus its z-scaled copy
#[derive(Debug, Clone)]
pub struct AnalyticTable {
    pub raw: DataFrame,
    pub scaled: DataFrame,
    pub weights: ReplicateWeights,
    pub id_column: String,
    pub poverty_column: String,
}

impl AnalyticTable {
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.raw
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Keep only the columns matched by `selection`, in input order
pub fn select_columns(df: &DataFrame, selection: &ColumnSelection) -> AnalysisResult<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(missing) = selection.required.iter().find(|r| !names.contains(r)) {
        return Err(AnalysisError::MissingColumn(missing.clone()));
    }

    let keep: Vec<String> = names.into_iter().filter(|n| selection.matches(n)).collect();
    Ok(df.select(keep)?)
}

/// Cast every column to `Float64`, failing if a value does not convert
pub fn cast_numeric_strict(df: &DataFrame) -> AnalysisResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| {
            let cast = col.cast(&DataType::Float64)?;
            let introduced = cast.null_count().saturating_sub(col.null_count());
            if introduced > 0 {
                return Err(AnalysisError::NonNumericColumn {
                    column: col.name().to_string(),
                    count: introduced,
                });
            }
            Ok(cast)
        })
        .collect::<AnalysisResult<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// 1 for the in-poverty codes, 0 for everything else including missing
pub fn recode_poverty_value(value: Option<f64>) -> f64 {
    match value {
        Some(v) if POVERTY_CODES.contains(&v) => 1.0,
        _ => 0.0,
    }
}

/// Replace the poverty column with its 0/1 recode
pub fn recode_poverty(df: &mut DataFrame, column: &str) -> AnalysisResult<()> {
    let values: Vec<f64> = df
        .column(column)
        .map_err(|_| AnalysisError::MissingColumn(column.to_string()))?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(recode_poverty_value)
        .collect();

    df.with_column(Column::new(column.into(), values))?;
    Ok(())
}

/// Fail if the identifier repeats
pub fn check_unique_ids(df: &DataFrame, id_column: &str) -> AnalysisResult<()> {
    let ids = df
        .column(id_column)
        .map_err(|_| AnalysisError::MissingColumn(id_column.to_string()))?
        .cast(&DataType::Float64)?;

    let mut seen = HashSet::with_capacity(ids.len());
    let duplicates = ids
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !seen.insert(v.to_bits()))
        .count();

    if duplicates > 0 {
        return Err(AnalysisError::DuplicateIdentifier {
            column: id_column.to_string(),
            count: duplicates,
        });
    }
    Ok(())
}

/// Sample mean and standard deviation (ddof 1), skipping nulls and NaN
pub fn mean_sd(values: impl Iterator<Item = Option<f64>>) -> Option<(f64, f64)> {
    let vals: Vec<f64> = values.flatten().filter(|v| !v.is_nan()).collect();
    if vals.len() < 2 {
        return None;
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    let var = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}

/// Copy of `df` with `columns` z-scored; other columns are untouched.
///
/// A column whose SD is zero or undefined becomes all-null.
pub fn z_scale(df: &DataFrame, columns: &[&str]) -> AnalysisResult<DataFrame> {
    let mut scaled = df.clone();

    for &name in columns {
        let Ok(col) = df.column(name) else {
            continue;
        };
        let ca = col.f64()?;

        let values: Vec<Option<f64>> = match mean_sd(ca.into_iter()) {
            Some((mean, sd)) if sd > 0.0 => ca
                .into_iter()
                .map(|v| v.map(|x| (x - mean) / sd))
                .collect(),
            _ => {
                tracing::warn!(column = name, "column has no spread; standardized values set to missing");
                vec![None; ca.len()]
            }
        };

        scaled.with_column(Column::new(name.into(), values))?;
    }

    Ok(scaled)
}

/// Build the analytic table from a loaded extract
pub fn reduce_dataset(df: &DataFrame, config: &AnalysisConfig) -> AnalysisResult<AnalyticTable> {
    let selection = ColumnSelection::from_config(config);
    let selected = select_columns(df, &selection)?;
    let mut raw = cast_numeric_strict(&selected)?;

    recode_poverty(&mut raw, &config.poverty_column)?;
    check_unique_ids(&raw, &config.id_column)?;

    let weights = config.replicate_weights();
    weights.validate(&raw)?;

    let scaled = z_scale(&raw, &all_measure_columns())?;

    tracing::info!(
        rows = raw.height(),
        columns = raw.width(),
        replicates = weights.len(),
        "analytic table reduced"
    );

    Ok(AnalyticTable {
        raw,
        scaled,
        weights,
        id_column: config.id_column.clone(),
        poverty_column: config.poverty_column.clone(),
    })
}

/// Save the reduced table (CSV or Parquet based on extension); no index column is written
pub fn save_reduced(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_rules() {
        assert!(ColumnRule::Exact("A".into()).matches("A"));
        assert!(!ColumnRule::Exact("A".into()).matches("AB"));
        assert!(ColumnRule::Prefix("W9C9P_2".into()).matches("W9C9P_280"));
        assert!(!ColumnRule::Prefix("W9C9P_2".into()).matches("W9C9P_1"));
    }

    #[test]
    fn test_recode_poverty_values() {
        assert_eq!(recode_poverty_value(Some(1.0)), 0.0);
        assert_eq!(recode_poverty_value(Some(2.0)), 1.0);
        assert_eq!(recode_poverty_value(Some(3.0)), 1.0);
        assert_eq!(recode_poverty_value(Some(-9.0)), 0.0);
        assert_eq!(recode_poverty_value(None), 0.0);
    }

    #[test]
    fn test_cast_numeric_strict_accepts_numeric_strings() {
        let df = df! { "a" => ["1", "2.5", "3"], "b" => [1i32, 2, 3] }.unwrap();
        let cast = cast_numeric_strict(&df).unwrap();
        assert_eq!(cast.column("a").unwrap().dtype(), &DataType::Float64);
        assert_eq!(cast.column("b").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_cast_numeric_strict_rejects_text() {
        let df = df! { "a" => [Some("1"), Some("oops"), None] }.unwrap();
        let err = cast_numeric_strict(&df).unwrap_err();
        assert!(matches!(err, AnalysisError::NonNumericColumn { ref column, count: 1 } if column == "a"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let df = df! { "CHILDID" => [1.0, 2.0, 2.0] }.unwrap();
        assert!(check_unique_ids(&df, "CHILDID").is_err());
        let df = df! { "CHILDID" => [1.0, 2.0, 3.0] }.unwrap();
        assert!(check_unique_ids(&df, "CHILDID").is_ok());
    }

    #[test]
    fn test_mean_sd() {
        let (m, s) = mean_sd([Some(2.0), None, Some(4.0), Some(f64::NAN)].into_iter()).unwrap();
        assert!((m - 3.0).abs() < 1e-12);
        assert!((s - 2f64.sqrt()).abs() < 1e-12);
        assert!(mean_sd([Some(1.0)].into_iter()).is_none());
    }

    #[test]
    fn test_z_scale_only_touches_listed_columns() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0],
            "w" => [5.0, 5.0, 5.0],
        }
        .unwrap();
        let scaled = z_scale(&df, &["x", "absent"]).unwrap();
        let x: Vec<f64> = scaled.column("x").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(x, vec![-1.0, 0.0, 1.0]);
        assert!(scaled
            .column("w")
            .unwrap()
            .as_materialized_series()
            .equals(df.column("w").unwrap().as_materialized_series()));
    }

    #[test]
    fn test_z_scale_constant_column_becomes_null() {
        let df = df! { "x" => [2.0, 2.0, 2.0] }.unwrap();
        let scaled = z_scale(&df, &["x"]).unwrap();
        assert_eq!(scaled.column("x").unwrap().null_count(), 3);
    }
}
