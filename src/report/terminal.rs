use std::time::Duration;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use crate::models::RunReport;

/// Render a colored terminal report.
pub fn render(report: &RunReport, quiet: bool) -> Result<()> {
    if quiet {
        println!("{}", summary_line(report));
        return Ok(());
    }

    println!("\n {} v{}", "modsweep".bold(), env!("CARGO_PKG_VERSION"));
    println!(
        " Window: {} → {}\n",
        report.since.to_rfc3339(),
        report.until.to_rfc3339()
    );

    let matched = report.matched.to_string();
    let matched = if report.matched > 0 {
        matched.green().bold()
    } else {
        matched.normal()
    };

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Analyzer           : {}", report.analyzer));
    println!(" │  {:<48} │", format!("Modules fetched    : {:>6}", report.fetched));
    println!(" │  {:<48} │", format!("Modules dispatched : {:>6}", report.dispatched));
    println!(" │  {:<48} │", format!("Modules analyzed   : {:>6}", report.attempted));
    println!(" │  {:<48} │", format!("Modules matched    : {:>6}", matched));
    println!(
        " │  {:<48} │",
        format!("Elapsed            : {}", elapsed(report))
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let skipped = report.dispatched.saturating_sub(report.attempted);
    if skipped > 0 {
        println!(
            " {} {} module(s) could not be analyzed (run with -vv for details)\n",
            "[SKIP]".yellow().bold(),
            skipped
        );
    }

    if !report.matched_packages.is_empty() {
        println!(" {} Modules matching:\n", "[MATCH]".green().bold());
        render_table(report);
        println!();
    }

    println!("{}", summary_line(report));
    Ok(())
}

fn render_table(report: &RunReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Module").add_attribute(Attribute::Bold),
        ]);

    for (idx, package) in report.matched_packages.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1).set_alignment(CellAlignment::Right),
            Cell::new(package.as_str()),
        ]);
    }

    println!("{}", table);
}

fn elapsed(report: &RunReport) -> String {
    let millis = u64::try_from(report.elapsed_ms).unwrap_or(u64::MAX);
    format!("{:.2?}", Duration::from_millis(millis))
}

/// One-line result, `matched/analyzed [elapsed]`.
pub fn summary_line(report: &RunReport) -> String {
    format!(
        "Number of packages which is pointed out: {}/{} [{}]",
        report.matched,
        report.attempted,
        elapsed(report)
    )
}
