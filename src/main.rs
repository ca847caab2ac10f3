//! jkreg: Jackknife Regression CLI Tool
//!
//! Reduces a survey extract to its analytic table and reports weighted
//! regressions with replicate-weight standard errors.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use jkreg::cli::{Cli, Commands};
use jkreg::config::AnalysisConfig;
use jkreg::pipeline::{
    batch_specs, load_dataset_with_progress, reduce_dataset, run_regression, save_reduced,
    AnalyticTable, RegressionSpec,
};
use jkreg::report::{display_bundle, export_batch_json, run_specs_with, RunMetadata};
use jkreg::utils::{
    advance_model_bar, create_model_bar, create_spinner, finish_with_success, finish_with_warning,
    print_banner, print_completion, print_config, print_info, print_step_header, print_step_time,
    print_success,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.to_config().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    let table = load_and_reduce(&config)?;

    match &cli.command {
        Some(Commands::Reduce) => {}
        Some(Commands::Fit {
            grade,
            race,
            outcome,
        }) => {
            let spec = RegressionSpec::new(*grade, race.as_str(), outcome.as_str());
            fit_one(&table, &spec, &config)?;
        }
        None => run_report(&table, &config)?,
    }

    print_completion();
    Ok(())
}

/// Steps 1-2: load, reduce and persist the analytic table
fn load_and_reduce(config: &AnalysisConfig) -> Result<AnalyticTable> {
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) =
        load_dataset_with_progress(&config.input, config.infer_schema_length)?;
    print_success("Dataset loaded");
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    print_step_header(2, "Reduce to Analytic Table");
    let step_start = Instant::now();
    let spinner = create_spinner("Selecting, recoding and scaling columns...");
    let table = reduce_dataset(&df, config).context("Failed to build analytic table")?;
    finish_with_success(
        &spinner,
        &format!(
            "Analytic table: {} rows × {} columns",
            table.height(),
            table.raw.width()
        ),
    );

    let spinner = create_spinner("Writing analytic table...");
    let mut reduced = table.raw.clone();
    save_reduced(&mut reduced, &config.output)?;
    finish_with_success(&spinner, &format!("Saved to {}", config.output.display()));
    print_step_time(step_start.elapsed());

    Ok(table)
}

fn fit_one(table: &AnalyticTable, spec: &RegressionSpec, config: &AnalysisConfig) -> Result<()> {
    print_step_header(3, "Jackknife Regression");
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting full-sample and replicate models...");
    match run_regression(table, spec, config.confidence) {
        Ok(bundle) => {
            finish_with_success(&spinner, "Model fitted");
            display_bundle(&bundle);
        }
        Err(e) => {
            finish_with_warning(&spinner, "Model not fitted");
            return Err(e).with_context(|| {
                format!(
                    "Regression failed for grade {}, {} / {}",
                    spec.grade_index, spec.race_column, spec.outcome_column
                )
            });
        }
    }
    print_step_time(step_start.elapsed());
    Ok(())
}

fn run_report(table: &AnalyticTable, config: &AnalysisConfig) -> Result<()> {
    print_step_header(3, "Jackknife Regressions");
    let step_start = Instant::now();
    let specs = batch_specs();
    let pb = create_model_bar(specs.len() as u64);
    let report = run_specs_with(table, specs, config.confidence, |entry| {
        advance_model_bar(&pb, entry)
    });
    pb.finish_and_clear();
    print_success(&format!(
        "{} of {} combinations fitted",
        report.succeeded(),
        report.entries.len()
    ));
    print_step_time(step_start.elapsed());

    print_step_header(4, "Results");
    for bundle in report.bundles() {
        display_bundle(bundle);
    }
    report.display();

    if let Some(path) = &config.json_output {
        export_batch_json(&report, path, RunMetadata::from_config(config))?;
        print_info(&format!("Results exported to {}", path.display()));
    }

    Ok(())
}
