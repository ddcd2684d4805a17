use anyhow::Result;

use crate::models::RunReport;

/// Print the report as pretty JSON on stdout.
pub fn render(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
