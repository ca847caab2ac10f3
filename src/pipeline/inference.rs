//! Design-based intervals, coefficient tests and the omnibus Wald F-test

use faer::Mat;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use super::error::{AnalysisError, AnalysisResult};
use super::wls::spd_inverse;

/// Estimate with standard error and t-test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Estimate with a two-sided confidence interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub term: String,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Joint test that a set of coefficients is zero
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaldTest {
    pub statistic: f64,
    pub num_df: usize,
    pub den_df: usize,
    pub p_value: f64,
}

impl WaldTest {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

fn t_dist(df: usize) -> AnalysisResult<StudentsT> {
    StudentsT::new(0.0, 1.0, df as f64).map_err(|_| AnalysisError::InsufficientDegreesOfFreedom {
        design_df: df,
        coefficients: 0,
    })
}

fn std_errors(cov: &Mat<f64>) -> Vec<f64> {
    (0..cov.nrows()).map(|i| cov[(i, i)].max(0.0).sqrt()).collect()
}

/// Two-sided p-value of `t` on `dist`
fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        (2.0 * dist.sf(t.abs())).min(1.0)
    }
}

/// Coefficient table with t statistics on `df` degrees of freedom
pub fn coefficient_table(
    terms: &[String],
    beta: &[f64],
    cov: &Mat<f64>,
    df: usize,
) -> AnalysisResult<Vec<CoefficientRow>> {
    let dist = t_dist(df)?;
    let se = std_errors(cov);

    Ok(terms
        .iter()
        .zip(beta.iter().zip(se.iter()))
        .map(|(term, (&estimate, &std_error))| {
            let t_value = estimate / std_error;
            CoefficientRow {
                term: term.clone(),
                estimate,
                std_error,
                t_value,
                p_value: two_sided_p(&dist, t_value),
            }
        })
        .collect())
}

/// t-based confidence intervals at `level` (e.g. 0.95)
pub fn confidence_intervals(
    terms: &[String],
    beta: &[f64],
    cov: &Mat<f64>,
    df: usize,
    level: f64,
) -> AnalysisResult<Vec<ConfidenceInterval>> {
    let dist = t_dist(df)?;
    let crit = dist.inverse_cdf(1.0 - (1.0 - level) / 2.0);
    let se = std_errors(cov);

    Ok(terms
        .iter()
        .zip(beta.iter().zip(se.iter()))
        .map(|(term, (&estimate, &std_error))| ConfidenceInterval {
            term: term.clone(),
            estimate,
            lower: estimate - crit * std_error,
            upper: estimate + crit * std_error,
        })
        .collect())
}

/// Wald F-test of `H0: beta[i] = 0` for every `i` in `indices`.
///
/// `F = bᵀ V⁻¹ b / k` on `(k, den_df)` degrees of freedom. A singular
/// covariance block gives NaN statistic and p-value.
pub fn wald_test(
    beta: &[f64],
    cov: &Mat<f64>,
    indices: &[usize],
    den_df: usize,
) -> AnalysisResult<WaldTest> {
    let k = indices.len();
    let sub = Mat::from_fn(k, k, |a, b| cov[(indices[a], indices[b])]);

    let (statistic, p_value) = match spd_inverse(&sub) {
        Some(inv) => {
            let mut quad = 0.0;
            for a in 0..k {
                for b in 0..k {
                    quad += beta[indices[a]] * inv[(a, b)] * beta[indices[b]];
                }
            }
            let statistic = quad / k as f64;
            let dist = FisherSnedecor::new(k as f64, den_df as f64).map_err(|_| {
                AnalysisError::InsufficientDegreesOfFreedom {
                    design_df: den_df,
                    coefficients: k,
                }
            })?;
            (statistic, dist.sf(statistic))
        }
        None => {
            tracing::warn!("covariance of tested terms is singular; Wald test undefined");
            (f64::NAN, f64::NAN)
        }
    };

    Ok(WaldTest {
        statistic,
        num_df: k,
        den_df,
        p_value,
    })
}
