//! `modsweep` — sweep freshly published Go modules for a usage pattern.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and install logging ([`logging`]).
//! 2. Load config ([`config::load_config`]) and merge flags over it.
//! 3. Walk the module index between `--since` and `--until` ([`index`]).
//! 4. Dispatch the first `-n` modules to the bounded worker pool
//!    ([`scheduler`]); each task prepares a workspace ([`workspace`]), runs
//!    the selected analyzer ([`analyzer`]), and records its outcome
//!    ([`aggregator`]).
//! 5. Render the requested report ([`report`]).

mod aggregator;
mod analyzer;
mod cli;
mod config;
mod error;
mod index;
mod logging;
mod models;
mod report;
mod scheduler;
mod search;
mod toolchain;
mod workspace;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use analyzer::Analyzer;
use cli::{Cli, ReportFormat};
use config::{load_config, Config, RunConfig};
use index::feed::HttpFeed;
use index::fetcher::fetch_since;
use scheduler::{dispatch_prefix, Scheduler};
use toolchain::go::GoToolchain;
use toolchain::Toolchain;
use workspace::WorkspaceManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;
    let run = resolve_run(&cli, &config)?;

    let toolchain: Arc<dyn Toolchain> = Arc::new(GoToolchain::new(&config.toolchain.go));
    let analyzer = Analyzer::new(
        run.analyzer,
        toolchain.clone(),
        run.tool_path.clone(),
        &run.pattern,
    )?;

    let chatty = !cli.quiet && cli.report == ReportFormat::Terminal;

    // Fetch stage: any error here ends the run before anything is analyzed.
    if chatty {
        eprintln!(
            "  {} fetching module index {} → {}",
            "→".cyan(),
            run.since.to_rfc3339(),
            run.until.to_rfc3339()
        );
    }
    let feed = HttpFeed::new(&config.feed.url, config.feed.timeout())?;
    let packages = fetch_since(&feed, run.since, run.until)
        .await
        .context("fetching module index")?;
    let dispatched = dispatch_prefix(&packages, run.dispatch_count);

    if chatty {
        eprintln!(
            "  {} {} modules fetched, analyzing {} with {} ({} at a time)",
            "→".cyan(),
            packages.len(),
            dispatched.len(),
            run.analyzer,
            run.max_parallelism
        );
    }

    let scratch_root = &config.workspace.scratch_root;
    tokio::fs::create_dir_all(scratch_root)
        .await
        .with_context(|| format!("creating scratch root {}", scratch_root.display()))?;
    let scratch_root = tokio::fs::canonicalize(scratch_root).await?;
    info!(root = %scratch_root.display(), "using scratch root");

    let workspaces = Arc::new(WorkspaceManager::new(scratch_root, toolchain));
    let mut scheduler =
        Scheduler::new(workspaces.clone(), Arc::new(analyzer), run.max_parallelism);
    if chatty {
        scheduler = scheduler.with_progress(progress_bar(dispatched.len())?);
    }

    let totals = scheduler.run(dispatched).await;
    workspaces.release_root().await;

    let report = report::build(&run, packages.len(), totals);
    match cli.report {
        ReportFormat::Terminal => report::terminal::render(&report, cli.quiet)?,
        ReportFormat::Json => report::json::render(&report)?,
    }

    Ok(())
}

/// Merge CLI flags over the loaded configuration.
fn resolve_run(cli: &Cli, config: &Config) -> Result<RunConfig> {
    let until = cli.until.unwrap_or_else(Utc::now);
    let since = cli.since.unwrap_or(until - TimeDelta::hours(24));

    // The vet tool runs inside each workspace, so relative paths must be
    // resolved against the invocation directory now.
    let tool_path = cli
        .vettool
        .as_ref()
        .map(|p| {
            p.canonicalize()
                .with_context(|| format!("vet tool {} not found", p.display()))
        })
        .transpose()?;

    let run = RunConfig {
        since,
        until,
        analyzer: cli.cmd.into(),
        tool_path,
        pattern: cli
            .pattern
            .clone()
            .unwrap_or_else(|| config.search.pattern.clone()),
        dispatch_count: cli.count,
        max_parallelism: cli.jobs.unwrap_or_else(num_cpus::get),
    };
    run.validate()?;
    Ok(run)
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
