//! Shared pieces of the import commands

use console::style;
use tabled::{builder::Builder, settings::Style};
use tracing::warn;

use crate::core::loader::{Record, Table};
use crate::core::runner::MutationReport;
use crate::entities::RowError;

/// Import statistics
#[derive(Debug, Default)]
pub struct ImportStats {
    pub rows_processed: usize,
    /// Rows rejected at load time or skipped for a missing reference
    pub skipped: usize,
    /// Records that already existed and were left alone
    pub existing: usize,
    pub report: MutationReport,
}

impl ImportStats {
    pub fn new(rows_processed: usize, skipped: usize) -> Self {
        Self {
            rows_processed,
            skipped,
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.report.succeeded()
    }

    pub fn errors(&self) -> usize {
        self.report.failed()
    }
}

/// Convert every record into a typed row, warning about and dropping the
/// ones that do not convert. Returns the rows and the number dropped.
pub fn convert_rows<T, F>(table: &Table, convert: F) -> (Vec<T>, usize)
where
    F: Fn(&Record<'_>) -> Result<T, RowError>,
{
    let mut rows = Vec::with_capacity(table.len());
    let mut rejected = 0;
    for record in table.records() {
        match convert(&record) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping row: {}", e);
                rejected += 1;
            }
        }
    }
    (rows, rejected)
}

/// Print the import summary block with a per-mutation table
pub fn print_summary(title: &str, stats: &ImportStats) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style(title).bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed:   {}", style(stats.rows_processed).cyan());
    println!("  Records created:  {}", style(stats.created()).green());
    if stats.existing > 0 {
        println!("  Already present:  {}", style(stats.existing).dim());
    }
    if stats.skipped > 0 {
        println!("  Skipped:          {}", style(stats.skipped).yellow());
    }
    if stats.errors() > 0 {
        println!("  Errors:           {}", style(stats.errors()).red());
    }

    if !stats.report.completed.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Mutation", "Count"]);
        for (mutation, count) in &stats.report.completed {
            builder.push_record([mutation.name().to_string(), count.to_string()]);
        }
        println!();
        println!("{}", builder.build().with(Style::rounded()));
    }

    if stats.errors() > 0 {
        println!();
        println!(
            "{} {} item(s) failed; see the warnings above for details.",
            style("!").yellow(),
            stats.errors()
        );
    }
}
