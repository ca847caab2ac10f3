//! Replicate-weight variance design (delete-one jackknife)

use std::fmt;

use faer::Mat;
use serde::Serialize;

/// Relative tolerance under which a replicate estimate counts as unchanged
const DEGENERATE_TOL: f64 = 1e-9;

/// Replication type of the design
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReplicationType {
    /// Delete-one-group jackknife
    Jk1,
}

impl fmt::Display for ReplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationType::Jk1 => write!(f, "JK1"),
        }
    }
}

/// Replicate design: how replicate estimates are combined into a variance.
///
/// `V = scale * Σ_r rscales[r] * (θ_r - θ)(θ_r - θ)ᵀ`, centred on the
/// full-sample estimate `θ`. Replicate weights are combined weights: they
/// already include the sampling weight.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplicateDesign {
    pub kind: ReplicationType,
    pub scale: f64,
    pub rscales: Vec<f64>,
}

impl ReplicateDesign {
    /// JK1 design over `n_replicates` combined replicate weights.
    ///
    /// Scale 1; each replicate carries `(R - 1) / R`. `R` is the replicate
    /// count of the full design, so subsetting rows later does not change it.
    pub fn jk1(n_replicates: usize) -> Self {
        let r = n_replicates as f64;
        let coef = if n_replicates > 0 { (r - 1.0) / r } else { 0.0 };
        Self {
            kind: ReplicationType::Jk1,
            scale: 1.0,
            rscales: vec![coef; n_replicates],
        }
    }

    pub fn n_replicates(&self) -> usize {
        self.rscales.len()
    }

    /// Design degrees of freedom (replicates minus one)
    pub fn degrees_of_freedom(&self) -> usize {
        self.n_replicates().saturating_sub(1)
    }

    /// Covariance of a parameter vector from its replicate estimates
    pub fn covariance(&self, full: &[f64], replicates: &[Vec<f64>]) -> Mat<f64> {
        let p = full.len();
        let mut cov = Mat::<f64>::zeros(p, p);

        for (theta, &rscale) in replicates.iter().zip(self.rscales.iter()) {
            let dev: Vec<f64> = theta.iter().zip(full.iter()).map(|(t, c)| t - c).collect();
            for i in 0..p {
                for j in 0..p {
                    cov[(i, j)] += self.scale * rscale * dev[i] * dev[j];
                }
            }
        }

        cov
    }

    /// True when no replicate moves any coefficient away from the full-sample fit.
    ///
    /// The replicate spread then carries no information about sampling variance.
    pub fn is_degenerate(&self, full: &[f64], replicates: &[Vec<f64>]) -> bool {
        replicates.iter().all(|theta| {
            theta
                .iter()
                .zip(full.iter())
                .all(|(t, f)| (t - f).abs() <= DEGENERATE_TOL * f.abs().max(1.0))
        })
    }
}
