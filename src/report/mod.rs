//! Report renderers for sweep results.
//!
//! - [`terminal`] — colored summary box and a table of matched modules;
//!   respects `--quiet`.
//! - [`json`] — the [`RunReport`] as pretty-printed JSON on stdout.

use crate::config::RunConfig;
use crate::models::{RunReport, RunTotals};

pub mod json;
pub mod terminal;

/// Combine the run's inputs and totals into a printable report.
pub fn build(run: &RunConfig, fetched: usize, totals: RunTotals) -> RunReport {
    RunReport {
        since: run.since,
        until: run.until,
        analyzer: run.analyzer,
        fetched,
        dispatched: totals.dispatched,
        attempted: totals.packages_attempted(),
        matched: totals.packages_matched(),
        elapsed_ms: totals.elapsed.as_millis(),
        matched_packages: totals.matched,
    }
}
