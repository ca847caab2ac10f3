//! Terminal rendering of one subgroup's model bundle

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use super::batch::format_p;
use crate::pipeline::{CoefficientRow, ConfidenceInterval, ModelBundle, VarianceSource, WaldTest};

fn header(cells: &[&str]) -> Vec<Cell> {
    cells
        .iter()
        .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
        .collect()
}

fn num(v: f64) -> Cell {
    Cell::new(format!("{:.4}", v)).set_alignment(CellAlignment::Right)
}

pub fn interval_table(rows: &[ConfidenceInterval], confidence: f64) -> Table {
    let pct = confidence * 100.0;
    let lower = format!("{:.1}% lower", pct);
    let upper = format!("{:.1}% upper", pct);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Term", "Estimate", lower.as_str(), upper.as_str()]));
    for r in rows {
        table.add_row(vec![Cell::new(&r.term), num(r.estimate), num(r.lower), num(r.upper)]);
    }
    table
}

pub fn coefficient_table(rows: &[CoefficientRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Term", "Estimate", "Std. Error", "t", "p"]));
    for r in rows {
        table.add_row(vec![
            Cell::new(&r.term),
            num(r.estimate),
            num(r.std_error),
            num(r.t_value),
            Cell::new(format_p(r.p_value))
                .set_alignment(CellAlignment::Right)
                .fg(if r.p_value < 0.05 { Color::Green } else { Color::White }),
        ]);
    }
    table
}

pub fn wald_table(test: &WaldTest) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["F", "num df", "den df", "p"]));
    table.add_row(vec![
        num(test.statistic),
        Cell::new(test.num_df),
        Cell::new(test.den_df),
        Cell::new(format_p(test.p_value)),
    ]);
    table
}

fn print_indented(title: &str, table: &Table) {
    println!();
    println!("      {}", style(title).yellow());
    for line in table.to_string().lines() {
        println!("      {}", line);
    }
}

/// Print all four parts of a bundle
pub fn display_bundle(bundle: &ModelBundle) {
    println!();
    println!(
        "    {} {} {} {} {}",
        style("◆").cyan().bold(),
        style(&bundle.grade_label).white().bold(),
        style("│").dim(),
        style(format!("{} ~ teacher ratings", bundle.outcome_column)).white(),
        style(format!("({} == 1, n = {})", bundle.race_column, bundle.n_obs)).dim()
    );
    println!("    {}", style("─".repeat(50)).dim());

    print_indented(
        "Confidence intervals",
        &interval_table(&bundle.intervals, bundle.confidence),
    );
    let se_title = match bundle.variance {
        VarianceSource::Replicate => format!("Coefficients ({} jackknife SE)", bundle.replication),
        VarianceSource::Analytic => format!("Coefficients ({} SE)", bundle.variance.label()),
    };
    print_indented(&se_title, &coefficient_table(&bundle.coefficients));
    print_indented("Omnibus Wald test", &wald_table(&bundle.omnibus));
    print_indented("Standardized coefficients", &coefficient_table(&bundle.standardized));
}
