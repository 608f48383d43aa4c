//! Run summary printed to stdout once the driver returns.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use mirrorsync_core::{IterationStats, RunReport, RunTotals};

#[derive(Tabled)]
struct IterationRow {
    #[tabled(rename = "#")]
    iteration: u32,
    #[tabled(rename = "copied")]
    copied: u64,
    #[tabled(rename = "removed")]
    removed: u64,
    #[tabled(rename = "dirs created")]
    dirs_created: u64,
    #[tabled(rename = "dirs removed")]
    dirs_removed: u64,
    #[tabled(rename = "errors")]
    errors: u64,
    #[tabled(rename = "bytes")]
    bytes: u64,
    #[tabled(rename = "seconds")]
    seconds: String,
}

impl From<&IterationStats> for IterationRow {
    fn from(s: &IterationStats) -> Self {
        Self {
            iteration: s.iteration,
            copied: s.files_copied,
            removed: s.files_removed,
            dirs_created: s.dirs_created,
            dirs_removed: s.dirs_removed,
            errors: s.errors,
            bytes: s.bytes_copied,
            seconds: format!("{:.3}", s.duration_seconds),
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    completed: bool,
    totals: RunTotals,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub fn print_json(report: &RunReport) -> Result<()> {
    let payload = ReportJson {
        completed: report.completed(),
        totals: report.totals(),
        report,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

pub fn print_table(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let rows: Vec<IterationRow> = report.iterations.iter().map(IterationRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let totals = report.totals();
    let ran = report.iterations.len();
    if report.interrupted {
        println!(
            "{prefix}{} stopped after {ran} of {} iterations",
            "■".yellow().bold(),
            report.configured_iterations
        );
    } else if totals.errors > 0 {
        println!(
            "{prefix}{} {ran} iterations, {} copied, {} removed, {} error(s)",
            "■".red().bold(),
            totals.files_copied,
            totals.files_removed + totals.dirs_removed,
            totals.errors
        );
    } else {
        println!(
            "{prefix}{} {ran} iterations, {} copied, {} removed",
            "✓".green().bold(),
            totals.files_copied,
            totals.files_removed + totals.dirs_removed
        );
    }
}
