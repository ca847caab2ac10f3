//! Pipeline module - loading, reduction and jackknife regression

pub mod design;
pub mod error;
pub mod inference;
pub mod loader;
pub mod reducer;
pub mod regression;
pub mod waves;
pub mod weights;
pub mod wls;

pub use design::{ReplicateDesign, ReplicationType};
pub use error::{AnalysisError, AnalysisResult};
pub use inference::{CoefficientRow, ConfidenceInterval, WaldTest};
pub use loader::*;
pub use reducer::*;
pub use regression::*;
pub use waves::*;
pub use weights::*;
