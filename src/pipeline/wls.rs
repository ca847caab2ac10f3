//! Weighted least squares on the normal equations

use faer::prelude::*;
use faer::{Mat, Side};

/// Coefficients of one weighted fit
#[derive(Debug, Clone)]
pub struct WlsFit {
    /// Intercept first, then one entry per predictor
    pub coefficients: Vec<f64>,
    /// Weighted residual sum of squares
    pub weighted_rss: f64,
}

/// Build the design matrix: an intercept column followed by the predictors.
///
/// `predictors` is column-major: one `Vec` per predictor, all of length `n`.
pub fn design_matrix(predictors: &[Vec<f64>]) -> Mat<f64> {
    let n = predictors.first().map_or(0, |c| c.len());
    Mat::from_fn(n, predictors.len() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            predictors[j - 1][i]
        }
    })
}

/// Solve `(XᵀWX) β = XᵀWy`.
///
/// Returns `None` when the weighted normal equations are not positive
/// definite (collinear predictors, or too few rows with positive weight).
pub fn weighted_least_squares(x: &Mat<f64>, y: &[f64], weights: &[f64]) -> Option<WlsFit> {
    let n = x.nrows();
    let p = x.ncols();
    if n != y.len() || n != weights.len() {
        return None;
    }

    let positive = weights.iter().filter(|&&w| w > 0.0).count();
    if positive < p {
        return None;
    }

    let xtwx = normal_matrix(x, weights);
    let wy = Mat::from_fn(n, 1, |i, _| y[i] * weights[i]);
    let xtwy = x.transpose() * &wy;

    let llt = xtwx.cholesky(Side::Lower).ok()?;
    let beta = llt.solve(&xtwy);
    let coefficients: Vec<f64> = (0..p).map(|j| beta[(j, 0)]).collect();
    if coefficients.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let weighted_rss = (0..n)
        .map(|i| {
            let fitted: f64 = (0..p).map(|j| x[(i, j)] * coefficients[j]).sum();
            let r = y[i] - fitted;
            weights[i] * r * r
        })
        .sum();

    Some(WlsFit {
        coefficients,
        weighted_rss,
    })
}

/// `XᵀWX`
fn normal_matrix(x: &Mat<f64>, weights: &[f64]) -> Mat<f64> {
    let xw = Mat::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] * weights[i]);
    x.transpose() * &xw
}

/// Model-based covariance of a weighted fit: `σ² (XᵀWX)⁻¹`.
///
/// `σ² = weighted_rss / (n - p)`, with `n` the rows of positive weight.
/// `None` when there are no residual degrees of freedom or `XᵀWX` is singular.
pub fn analytic_covariance(x: &Mat<f64>, weights: &[f64], fit: &WlsFit) -> Option<Mat<f64>> {
    let p = x.ncols();
    let positive = weights.iter().filter(|&&w| w > 0.0).count();
    if positive <= p {
        return None;
    }
    let sigma2 = fit.weighted_rss / (positive - p) as f64;
    let inv = spd_inverse(&normal_matrix(x, weights))?;
    Some(Mat::from_fn(p, p, |i, j| sigma2 * inv[(i, j)]))
}

/// Inverse of a symmetric positive definite matrix, `None` if it is not.
pub fn spd_inverse(m: &Mat<f64>) -> Option<Mat<f64>> {
    let p = m.nrows();
    let llt = m.cholesky(Side::Lower).ok()?;
    let inv = llt.solve(&Mat::<f64>::identity(p, p));
    let finite = (0..p).all(|i| (0..p).all(|j| inv[(i, j)].is_finite()));
    finite.then_some(inv)
}
