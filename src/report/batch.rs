//! Batch driver: every (grade, race, subject) combination, failures isolated per call

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::{
    batch_specs, grade_wave, run_regression, AnalysisResult, AnalyticTable, ModelBundle,
    RegressionSpec,
};

/// Outcome of one combination
#[derive(Debug)]
pub struct BatchEntry {
    pub spec: RegressionSpec,
    pub result: AnalysisResult<ModelBundle>,
}

impl BatchEntry {
    pub fn status(&self) -> EntryStatus {
        match &self.result {
            Ok(_) => EntryStatus::Fitted,
            Err(e) if e.is_insufficient_sample() => EntryStatus::InsufficientSample,
            Err(_) => EntryStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    Fitted,
    InsufficientSample,
    Failed,
}

/// All combinations in report order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn bundles(&self) -> impl Iterator<Item = &ModelBundle> {
        self.entries.iter().filter_map(|e| e.result.as_ref().ok())
    }

    /// Overview table: one row per combination
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Grade").add_attribute(Attribute::Bold),
            Cell::new("Race").add_attribute(Attribute::Bold),
            Cell::new("Outcome").add_attribute(Attribute::Bold),
            Cell::new("N").add_attribute(Attribute::Bold),
            Cell::new("F").add_attribute(Attribute::Bold),
            Cell::new("df").add_attribute(Attribute::Bold),
            Cell::new("p").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for entry in &self.entries {
            let grade = grade_wave(entry.spec.grade_index)
                .map(|w| w.label.to_string())
                .unwrap_or_else(|_| entry.spec.grade_index.to_string());
            let mut row = vec![
                Cell::new(grade),
                Cell::new(&entry.spec.race_column),
                Cell::new(&entry.spec.outcome_column),
            ];
            match &entry.result {
                Ok(bundle) => {
                    let p = bundle.omnibus.p_value;
                    row.extend([
                        Cell::new(bundle.n_obs),
                        Cell::new(format!("{:.3}", bundle.omnibus.statistic)),
                        Cell::new(format!("{}, {}", bundle.omnibus.num_df, bundle.omnibus.den_df)),
                        Cell::new(format_p(p)).fg(if p < 0.05 { Color::Green } else { Color::White }),
                        Cell::new("fitted").fg(Color::Green),
                    ]);
                }
                Err(e) => {
                    let (label, color) = if e.is_insufficient_sample() {
                        ("insufficient sample", Color::Yellow)
                    } else {
                        ("failed", Color::Red)
                    };
                    row.extend([
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new(label).fg(color),
                    ]);
                }
            }
            table.add_row(row);
        }

        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("REGRESSION SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        for line in self.summary_table().to_string().lines() {
            println!("    {}", line);
        }

        let failures: Vec<&BatchEntry> = self.entries.iter().filter(|e| e.result.is_err()).collect();
        if !failures.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Not fitted").yellow(),
                style(format!("({})", failures.len())).dim()
            );
            for entry in failures {
                if let Err(e) = &entry.result {
                    println!(
                        "        {} {} / {}: {}",
                        style("•").dim(),
                        entry.spec.race_column,
                        entry.spec.outcome_column,
                        e
                    );
                }
            }
        }
    }
}

/// p-value with a floor for display
pub fn format_p(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 1e-4 {
        "<0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}

/// Run a list of combinations sequentially; a failing call does not stop the rest.
///
/// `on_entry` sees each entry as soon as it is computed.
pub fn run_specs_with<F>(
    table: &AnalyticTable,
    specs: Vec<RegressionSpec>,
    confidence: f64,
    mut on_entry: F,
) -> BatchReport
where
    F: FnMut(&BatchEntry),
{
    let entries = specs
        .into_iter()
        .map(|spec| {
            let result = run_regression(table, &spec, confidence);
            if let Err(e) = &result {
                tracing::warn!(
                    grade = spec.grade_index,
                    race = %spec.race_column,
                    outcome = %spec.outcome_column,
                    error = %e,
                    "subgroup regression skipped"
                );
            }
            let entry = BatchEntry { spec, result };
            on_entry(&entry);
            entry
        })
        .collect();

    BatchReport { entries }
}

pub fn run_specs(table: &AnalyticTable, specs: Vec<RegressionSpec>, confidence: f64) -> BatchReport {
    run_specs_with(table, specs, confidence, |_| {})
}

/// All 24 fixed combinations
pub fn run_batch(table: &AnalyticTable, confidence: f64) -> BatchReport {
    run_specs(table, batch_specs(), confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_p() {
        assert_eq!(format_p(f64::NAN), "NA");
        assert_eq!(format_p(0.00001), "<0.0001");
        assert_eq!(format_p(0.04321), "0.0432");
    }

    #[test]
    fn test_empty_report_counts() {
        let report = BatchReport::default();
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 0);
    }
}
