//! Jackknife replicate-weight regression for one (grade, race, outcome) subgroup
//!
//! The study population is the in-poverty members of one race subgroup.
//! Each call filters the analytic table, fits weighted least squares on the
//! full-sample weight and on every replicate weight, and turns the replicate
//! spread into design-based standard errors.

use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::design::{ReplicateDesign, ReplicationType};
use super::error::{AnalysisError, AnalysisResult};
use super::inference::{
    coefficient_table, confidence_intervals, wald_test, CoefficientRow, ConfidenceInterval,
    WaldTest,
};
use super::reducer::AnalyticTable;
use super::waves::{grade_wave, RegressionSpec};
use super::weights::{get_weights, total_weight};
use super::wls::{analytic_covariance, design_matrix, weighted_least_squares};
use crate::config::DEFAULT_CONFIDENCE;

pub const INTERCEPT: &str = "(Intercept)";

/// Position of each analytic row in the analytic table
pub const ROW_INDEX: &str = "__row_index";

/// Where a bundle's coefficient covariance came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VarianceSource {
    /// Spread of the replicate fits around the full-sample fit
    Replicate,
    /// `σ² (XᵀWX)⁻¹`: every replicate reproduced the full-sample fit
    Analytic,
}

impl VarianceSource {
    pub fn label(&self) -> &'static str {
        match self {
            VarianceSource::Replicate => "replicate weights",
            VarianceSource::Analytic => "analytic weighted OLS",
        }
    }
}

/// Everything one subgroup regression produces
#[derive(Debug, Clone, Serialize)]
pub struct ModelBundle {
    pub grade_index: usize,
    pub grade_label: String,
    pub race_column: String,
    pub outcome_column: String,
    /// Complete-case rows in the subgroup
    pub n_obs: usize,
    pub replicates: usize,
    pub replication: ReplicationType,
    pub variance: VarianceSource,
    pub confidence: f64,
    pub intervals: Vec<ConfidenceInterval>,
    pub coefficients: Vec<CoefficientRow>,
    pub omnibus: WaldTest,
    pub standardized: Vec<CoefficientRow>,
}

impl ModelBundle {
    /// Point estimates in term order
    pub fn estimates(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }

    pub fn coefficient(&self, term: &str) -> Option<&CoefficientRow> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    pub fn standardized_coefficient(&self, term: &str) -> Option<&CoefficientRow> {
        self.standardized.iter().find(|c| c.term == term)
    }
}

/// Membership in the study population: race indicator and poverty indicator both 1
pub fn in_subpopulation(race: Option<f64>, poverty: Option<f64>) -> bool {
    race == Some(1.0) && poverty == Some(1.0)
}

fn float_values(df: &DataFrame, column: &str) -> AnalysisResult<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| AnalysisError::MissingColumn(column.to_string()))?
        .cast(&DataType::Float64)?;
    let values = col.f64()?.into_iter().collect();
    Ok(values)
}

/// Row mask for race == 1 and poverty == 1
pub fn subpopulation_mask(
    df: &DataFrame,
    race_column: &str,
    poverty_column: &str,
) -> AnalysisResult<BooleanChunked> {
    let race = float_values(df, race_column)?;
    let poverty = float_values(df, poverty_column)?;
    let mask: Vec<bool> = race
        .iter()
        .zip(poverty.iter())
        .map(|(&r, &p)| in_subpopulation(r, p))
        .collect();
    Ok(BooleanChunked::from_slice("subpopulation".into(), &mask))
}

/// Keep the study-population rows; the indicator columns stay in place
pub fn filter_subpopulation(
    df: &DataFrame,
    race_column: &str,
    poverty_column: &str,
) -> AnalysisResult<DataFrame> {
    let mask = subpopulation_mask(df, race_column, poverty_column)?;
    Ok(df.filter(&mask)?)
}

/// Drop the indicator columns once the filter has been applied
pub fn drop_filter_columns(
    df: &DataFrame,
    race_column: &str,
    poverty_column: &str,
) -> AnalysisResult<DataFrame> {
    Ok(df.drop(race_column)?.drop(poverty_column)?)
}

/// Rows with a present, non-NaN value in every listed column
fn complete_case_mask(df: &DataFrame, columns: &[&str]) -> AnalysisResult<BooleanChunked> {
    let values = columns
        .iter()
        .map(|c| float_values(df, c))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let mask: Vec<bool> = (0..df.height())
        .map(|i| {
            values
                .iter()
                .all(|col| matches!(col[i], Some(v) if !v.is_nan()))
        })
        .collect();
    Ok(BooleanChunked::from_slice("complete".into(), &mask))
}

/// Analytic rows of one regression.
///
/// Selects the weights, the wave's scales, the outcome and both indicators,
/// keeps race == 1 and poverty == 1, drops the two indicator columns and
/// then every row with a missing or NaN value. [`ROW_INDEX`] holds each
/// row's position in the analytic table.
pub fn analysis_frame(table: &AnalyticTable, spec: &RegressionSpec) -> AnalysisResult<DataFrame> {
    let wave = grade_wave(spec.grade_index)?;
    let race_column = spec.race_column.as_str();
    let poverty_column = table.poverty_column.as_str();

    let mut analytic: Vec<&str> = table.weights.all_columns().collect();
    analytic.extend(wave.predictor_columns);
    analytic.push(spec.outcome_column.as_str());

    let mut selected = analytic.clone();
    selected.extend([race_column, poverty_column]);
    if let Some(missing) = selected.iter().find(|c| table.raw.column(c).is_err()) {
        return Err(AnalysisError::MissingColumn(missing.to_string()));
    }

    let frame = table
        .raw
        .select(selected)?
        .with_row_index(ROW_INDEX.into(), None)?;
    let frame = filter_subpopulation(&frame, race_column, poverty_column)?;
    let frame = drop_filter_columns(&frame, race_column, poverty_column)?;

    let complete = complete_case_mask(&frame, &analytic)?;
    Ok(frame.filter(&complete)?)
}

fn row_positions(frame: &DataFrame) -> AnalysisResult<Vec<usize>> {
    let index = frame.column(ROW_INDEX)?.cast(&DataType::UInt64)?;
    Ok(index.u64()?.into_no_null_iter().map(|i| i as usize).collect())
}

fn gather(values: &[Option<f64>], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&i| values[i].unwrap_or(f64::NAN)).collect()
}

fn gather_column(df: &DataFrame, column: &str, rows: &[usize]) -> AnalysisResult<Vec<f64>> {
    Ok(gather(&float_values(df, column)?, rows))
}

fn gather_weights(df: &DataFrame, column: &str, rows: &[usize]) -> AnalysisResult<Vec<f64>> {
    Ok(gather(&get_weights(df, column)?, rows))
}

/// Full-sample estimate with its covariance and inference degrees of freedom
struct ReplicatedFit {
    beta: Vec<f64>,
    cov: Mat<f64>,
    residual_df: usize,
    variance: VarianceSource,
}

/// Fit on the full-sample weight and every replicate weight.
///
/// When no replicate moves the estimate the jackknife spread is identically
/// zero; the covariance then falls back to the model-based weighted-OLS
/// variance on `n - p` residual degrees of freedom.
fn fit_replicated(
    x: &Mat<f64>,
    y: &[f64],
    primary: &[f64],
    replicates: &[Vec<f64>],
    replicate_names: &[String],
    design: &ReplicateDesign,
    label: &str,
) -> AnalysisResult<ReplicatedFit> {
    let n_coef = x.ncols();
    let full = weighted_least_squares(x, y, primary).ok_or_else(|| AnalysisError::SingularDesign {
        fit: format!("{} full-sample fit", label),
    })?;

    let replicate_estimates = replicates
        .par_iter()
        .zip(replicate_names.par_iter())
        .map(|(w, name)| {
            weighted_least_squares(x, y, w)
                .map(|fit| fit.coefficients)
                .ok_or_else(|| AnalysisError::SingularDesign {
                    fit: format!("{} replicate {}", label, name),
                })
        })
        .collect::<AnalysisResult<Vec<Vec<f64>>>>()?;

    if !replicate_estimates.is_empty()
        && design.is_degenerate(&full.coefficients, &replicate_estimates)
    {
        let cov = analytic_covariance(x, primary, &full).ok_or_else(|| {
            AnalysisError::SingularDesign {
                fit: format!("{} analytic covariance", label),
            }
        })?;
        let positive = primary.iter().filter(|&&w| w > 0.0).count();
        tracing::warn!(
            fit = label,
            replicates = replicate_estimates.len(),
            "replicate weights reproduce the full-sample fit; using analytic weighted-OLS variance"
        );
        return Ok(ReplicatedFit {
            beta: full.coefficients,
            cov,
            residual_df: positive - n_coef,
            variance: VarianceSource::Analytic,
        });
    }

    let design_df = design.degrees_of_freedom();
    if design_df + 1 <= n_coef {
        return Err(AnalysisError::InsufficientDegreesOfFreedom {
            design_df,
            coefficients: n_coef,
        });
    }

    let cov = design.covariance(&full.coefficients, &replicate_estimates);
    Ok(ReplicatedFit {
        beta: full.coefficients,
        cov,
        residual_df: design_df + 1 - n_coef,
        variance: VarianceSource::Replicate,
    })
}

/// Standardized rows when a scaled column has no spread
fn undefined_rows(terms: &[String]) -> Vec<CoefficientRow> {
    terms
        .iter()
        .map(|term| CoefficientRow {
            term: term.clone(),
            estimate: f64::NAN,
            std_error: f64::NAN,
            t_value: f64::NAN,
            p_value: f64::NAN,
        })
        .collect()
}

/// Fit one subgroup: outcome on the wave's four teacher-rated scales.
pub fn run_regression(
    table: &AnalyticTable,
    spec: &RegressionSpec,
    confidence: f64,
) -> AnalysisResult<ModelBundle> {
    let wave = grade_wave(spec.grade_index)?;
    let race_column = spec.race_column.as_str();
    let outcome_column = spec.outcome_column.as_str();

    table.weights.validate(&table.raw)?;

    let predictors = wave.predictor_columns;
    let frame = analysis_frame(table, spec)?;
    let rows = row_positions(&frame)?;
    let n_coef = predictors.len() + 1;

    tracing::debug!(
        grade = wave.label,
        race = race_column,
        outcome = outcome_column,
        rows = rows.len(),
        "subgroup filtered"
    );

    if rows.len() <= n_coef {
        return Err(AnalysisError::InsufficientSample {
            rows: rows.len(),
            coefficients: n_coef,
            detail: format!(
                "{} == 1, {} == 1, complete cases",
                race_column, table.poverty_column
            ),
        });
    }

    let primary = gather_weights(&table.raw, &table.weights.primary, &rows)?;
    if total_weight(&primary) <= 0.0 {
        return Err(AnalysisError::InsufficientSample {
            rows: rows.len(),
            coefficients: n_coef,
            detail: "total full-sample weight is zero".to_string(),
        });
    }
    let replicates = table
        .weights
        .replicates
        .iter()
        .map(|c| gather_weights(&table.raw, c, &rows))
        .collect::<AnalysisResult<Vec<_>>>()?;

    let design = ReplicateDesign::jk1(table.weights.len());

    let terms: Vec<String> = std::iter::once(INTERCEPT)
        .chain(predictors)
        .map(String::from)
        .collect();

    // Unstandardized model
    let x_cols = predictors
        .iter()
        .map(|c| gather_column(&table.raw, c, &rows))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let x = design_matrix(&x_cols);
    let y = gather_column(&table.raw, outcome_column, &rows)?;
    let fit = fit_replicated(
        &x,
        &y,
        &primary,
        &replicates,
        &table.weights.replicates,
        &design,
        "unstandardized",
    )?;

    let intervals = confidence_intervals(&terms, &fit.beta, &fit.cov, fit.residual_df, confidence)?;
    let coefficients = coefficient_table(&terms, &fit.beta, &fit.cov, fit.residual_df)?;
    let tested: Vec<usize> = (1..n_coef).collect();
    let omnibus = wald_test(&fit.beta, &fit.cov, &tested, fit.residual_df)?;

    // Same rows on the z-scaled table; a constant column scales to null
    let zx_cols = predictors
        .iter()
        .map(|c| gather_column(&table.scaled, c, &rows))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let zy = gather_column(&table.scaled, outcome_column, &rows)?;
    let unscalable: Vec<&str> = predictors
        .iter()
        .copied()
        .zip(zx_cols.iter())
        .chain(std::iter::once((outcome_column, &zy)))
        .filter(|(_, values)| values.iter().any(|v| v.is_nan()))
        .map(|(name, _)| name)
        .collect();

    let standardized = if unscalable.is_empty() {
        let zfit = fit_replicated(
            &design_matrix(&zx_cols),
            &zy,
            &primary,
            &replicates,
            &table.weights.replicates,
            &design,
            "standardized",
        )?;
        coefficient_table(&terms, &zfit.beta, &zfit.cov, zfit.residual_df)?
    } else {
        tracing::warn!(
            grade = wave.label,
            race = race_column,
            outcome = outcome_column,
            columns = ?unscalable,
            "zero standard deviation; standardized coefficients undefined"
        );
        undefined_rows(&terms)
    };

    tracing::info!(
        grade = wave.label,
        race = race_column,
        outcome = outcome_column,
        n = rows.len(),
        f = omnibus.statistic,
        p = omnibus.p_value,
        variance = fit.variance.label(),
        "subgroup regression fitted"
    );

    Ok(ModelBundle {
        grade_index: wave.grade_index,
        grade_label: wave.label.to_string(),
        race_column: race_column.to_string(),
        outcome_column: outcome_column.to_string(),
        n_obs: rows.len(),
        replicates: design.n_replicates(),
        replication: design.kind,
        variance: fit.variance,
        confidence,
        intervals,
        coefficients,
        omnibus,
        standardized,
    })
}

/// Fit one subgroup by grade index and column names, at 95% confidence
pub fn fit_subgroup(
    table: &AnalyticTable,
    grade_index: usize,
    race_column: &str,
    outcome_column: &str,
) -> AnalysisResult<ModelBundle> {
    let spec = RegressionSpec::new(grade_index, race_column, outcome_column);
    run_regression(table, &spec, DEFAULT_CONFIDENCE)
}
