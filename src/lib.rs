//! jkreg: Jackknife Replicate-Weight Regression Library
//!
//! Reduces a longitudinal survey extract to an analytic table and fits
//! weighted linear regressions of reading and math outcomes on teacher-rated
//! behavior scales, with delete-one jackknife standard errors, for in-poverty
//! members of each race subgroup.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod utils;
