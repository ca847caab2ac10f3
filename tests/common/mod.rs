//! Shared test utilities and fixture generators

#![allow(dead_code)]

use faer::Mat;
use jkreg::config::AnalysisConfig;
use jkreg::pipeline::wls::{design_matrix, spd_inverse, weighted_least_squares};
use jkreg::pipeline::{reduce_dataset, AnalyticTable, GRADE_WAVES};
use polars::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tempfile::TempDir;

pub const PREFIX: &str = "W9C9P_2";

/// Coefficients used to generate every outcome: intercept, then the four scales
pub const TRUE_BETA: [f64; 5] = [0.5, 0.8, -0.4, 0.3, -0.2];

/// Uniform noise half-width added to generated outcomes
pub const NOISE: f64 = 0.1;

fn weight_name(r: usize) -> String {
    format!("{}{}", PREFIX, r)
}

/// Full-sample weight plus JK1 replicates built by dropping one group per
/// replicate; row `i` belongs to group `i % replicates`.
fn jk1_weight_columns(primary: &[f64], replicates: usize) -> Vec<Column> {
    let factor = replicates as f64 / (replicates as f64 - 1.0);
    let mut columns = vec![Column::new(weight_name(0).into(), primary.to_vec())];
    for r in 1..=replicates {
        let values: Vec<f64> = primary
            .iter()
            .enumerate()
            .map(|(i, &w)| if i % replicates == r - 1 { 0.0 } else { w * factor })
            .collect();
        columns.push(Column::new(weight_name(r).into(), values));
    }
    columns
}

fn outcome(x: &[f64; 4], rng: &mut StdRng) -> f64 {
    TRUE_BETA[0]
        + x.iter()
            .zip(TRUE_BETA[1..].iter())
            .map(|(v, b)| v * b)
            .sum::<f64>()
        + (rng.gen::<f64>() - 0.5) * 2.0 * NOISE
}

/// Create a synthetic longitudinal extract with known structure.
///
/// - `CHILDID`: unique 1..=n
/// - weight block `W9C9P_20` .. `W9C9P_2{replicates}`
/// - every wave's four scales (uniform 1..4) and both outcomes, generated
///   from `TRUE_BETA` plus small noise
/// - `X_BLACK_R` on even rows, `X_HISP_R` on odd rows
/// - `X2POVTY` cycling 1, 2, 3 so two thirds of each group is in poverty
/// - two unrelated columns that reduction must drop
pub fn create_survey_dataframe(n: usize, replicates: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::new("CHILDID".into(), (1..=n as i64).collect::<Vec<_>>()));

    let primary: Vec<f64> = (0..n).map(|_| 50.0 + rng.gen::<f64>() * 100.0).collect();
    columns.extend(jk1_weight_columns(&primary, replicates));

    for wave in GRADE_WAVES.iter() {
        let mut scales: [Vec<f64>; 4] = Default::default();
        let mut reading = Vec::with_capacity(n);
        let mut math = Vec::with_capacity(n);
        for _ in 0..n {
            let x: [f64; 4] = std::array::from_fn(|_| 1.0 + rng.gen::<f64>() * 3.0);
            for (k, v) in x.iter().enumerate() {
                scales[k].push(*v);
            }
            reading.push(outcome(&x, &mut rng));
            math.push(outcome(&x, &mut rng));
        }
        for (name, values) in wave.predictor_columns.iter().zip(scales) {
            columns.push(Column::new((*name).into(), values));
        }
        columns.push(Column::new(wave.reading_column.into(), reading));
        columns.push(Column::new(wave.math_column.into(), math));
    }

    columns.push(Column::new(
        "X_BLACK_R".into(),
        (0..n).map(|i| (i % 2 == 0) as i32).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "X_HISP_R".into(),
        (0..n).map(|i| (i % 2 == 1) as i32).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "X2POVTY".into(),
        (0..n).map(|i| (i % 3 + 1) as i32).collect::<Vec<_>>(),
    ));

    columns.push(Column::new(
        "X1AGE".into(),
        (0..n).map(|i| 60.0 + (i % 12) as f64).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "S2_SCHOOL".into(),
        (0..n).map(|i| format!("school_{}", i % 7)).collect::<Vec<_>>(),
    ));

    DataFrame::new(columns).unwrap()
}

/// Kindergarten-only extract where every row is Black and in poverty and
/// replicate `r` drops exactly row `r - 1` (R = n).
pub fn create_delete_one_dataframe(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let wave = &GRADE_WAVES[0];

    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::new("CHILDID".into(), (1..=n as i64).collect::<Vec<_>>()));

    let primary: Vec<f64> = (0..n).map(|_| 1.0 + rng.gen::<f64>() * 4.0).collect();
    columns.extend(jk1_weight_columns(&primary, n));

    let mut scales: [Vec<f64>; 4] = Default::default();
    let mut reading = Vec::with_capacity(n);
    for _ in 0..n {
        let x: [f64; 4] = std::array::from_fn(|_| 1.0 + rng.gen::<f64>() * 3.0);
        for (k, v) in x.iter().enumerate() {
            scales[k].push(*v);
        }
        reading.push(outcome(&x, &mut rng) + rng.gen::<f64>());
    }
    for (name, values) in wave.predictor_columns.iter().zip(scales) {
        columns.push(Column::new((*name).into(), values));
    }
    columns.push(Column::new(wave.reading_column.into(), reading));

    columns.push(Column::new("X_BLACK_R".into(), vec![1i32; n]));
    columns.push(Column::new("X_HISP_R".into(), vec![0i32; n]));
    columns.push(Column::new("X2POVTY".into(), vec![2i32; n]));

    DataFrame::new(columns).unwrap()
}

/// Kindergarten-only extract with unit weights everywhere.
///
/// `CHILDID` 1..=n, `W9C9P_20` and every replicate equal to 1, every row
/// Black with poverty code 2. The replicates cannot move the estimate.
pub fn create_unit_weight_dataframe(n: usize, replicates: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let wave = &GRADE_WAVES[0];

    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::new("CHILDID".into(), (1..=n as i64).collect::<Vec<_>>()));
    for r in 0..=replicates {
        columns.push(Column::new(weight_name(r).into(), vec![1.0; n]));
    }

    let mut scales: [Vec<f64>; 4] = Default::default();
    let mut reading = Vec::with_capacity(n);
    for _ in 0..n {
        let x: [f64; 4] = std::array::from_fn(|_| 1.0 + rng.gen::<f64>() * 3.0);
        for (k, v) in x.iter().enumerate() {
            scales[k].push(*v);
        }
        reading.push(outcome(&x, &mut rng));
    }
    for (name, values) in wave.predictor_columns.iter().zip(scales) {
        columns.push(Column::new((*name).into(), values));
    }
    columns.push(Column::new(wave.reading_column.into(), reading));

    columns.push(Column::new("X_BLACK_R".into(), vec![1i32; n]));
    columns.push(Column::new("X_HISP_R".into(), vec![0i32; n]));
    columns.push(Column::new("X2POVTY".into(), vec![2i32; n]));

    DataFrame::new(columns).unwrap()
}

/// Model-based weighted-OLS variances `σ² diag((XᵀWX)⁻¹)`, `σ² = rss / (n - p)`
pub fn analytic_variances(x: &[Vec<f64>], y: &[f64], w: &[f64]) -> Vec<f64> {
    let design = design_matrix(x);
    let fit = weighted_least_squares(&design, y, w).unwrap();
    let n = w.iter().filter(|&&v| v > 0.0).count();
    let p = design.ncols();
    let sigma2 = fit.weighted_rss / (n - p) as f64;

    let xtwx = Mat::from_fn(p, p, |a, b| {
        (0..design.nrows())
            .map(|i| w[i] * design[(i, a)] * design[(i, b)])
            .sum::<f64>()
    });
    let inv = spd_inverse(&xtwx).unwrap();
    (0..p).map(|j| sigma2 * inv[(j, j)]).collect()
}

/// Numeric column as a dense `Vec<f64>`
pub fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

/// Overwrite every replicate column with the full-sample weight
pub fn with_degenerate_replicates(df: &DataFrame, replicates: usize) -> DataFrame {
    let primary = column_values(df, &weight_name(0));
    let mut out = df.clone();
    for r in 1..=replicates {
        out.with_column(Column::new(weight_name(r).into(), primary.clone()))
            .unwrap();
    }
    out
}

/// Configuration for a fixture; output lands in `dir`
pub fn test_config(dir: &TempDir, replicates: usize) -> AnalysisConfig {
    let mut config = AnalysisConfig::new(
        dir.path().join("input.csv"),
        dir.path().join("reduced.csv"),
    );
    config.replicates = replicates;
    config
}

/// Reduce a fixture frame straight to its analytic table
pub fn reduce_fixture(df: &DataFrame, replicates: usize) -> AnalyticTable {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, replicates);
    reduce_dataset(df, &config).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that two floats agree to a relative-or-absolute tolerance
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tol * scale,
        "expected {}, got {} (tolerance {})",
        expected,
        actual,
        tol
    );
}
