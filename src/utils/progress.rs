//! Spinners and the per-model batch bar

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::report::BatchEntry;

/// Spinner for a single step (load, reduce, one fit)
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("    {spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("◐◓◑◒ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Bar over the regression batch, one tick per (grade, race, subject) model
pub fn create_model_bar(models: u64) -> ProgressBar {
    let pb = ProgressBar::new(models);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("    {prefix:.bold} {bar:30.cyan/dim} {pos:>2}/{len} models  {wide_msg:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─"),
    );
    pb.set_prefix("Fitting");
    pb
}

/// Tick the batch bar and show which combination just finished
pub fn advance_model_bar(pb: &ProgressBar, entry: &BatchEntry) {
    let marker = if entry.result.is_ok() { "fitted" } else { "skipped" };
    pb.set_message(format!(
        "grade {} {} / {} {}",
        entry.spec.grade_index, entry.spec.race_column, entry.spec.outcome_column, marker
    ));
    pb.inc(1);
}

pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", style("✓").green().bold(), message));
}

pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", style("⚠").yellow().bold(), message));
}
