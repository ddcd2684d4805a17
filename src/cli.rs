use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};

use crate::models::AnalyzerKind;

#[derive(Parser, Debug)]
#[command(
    name = "modsweep",
    about = "Sweep freshly published Go modules for a usage pattern",
    version
)]
pub struct Cli {
    /// Way of searching each module
    #[arg(long, value_name = "CMD")]
    pub cmd: AnalyzerArg,

    /// Custom analysis tool passed to `go vet -vettool`
    #[arg(long, value_name = "PATH")]
    pub vettool: Option<PathBuf>,

    /// Regular expression for the grep analyzer [default: from config, `\benum\b`]
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Number of modules to analyze
    #[arg(short = 'n', long = "count", default_value_t = 10)]
    pub count: usize,

    /// Start of the index window (RFC 3339) [default: 24 hours before --until]
    #[arg(long, value_name = "TIME")]
    pub since: Option<DateTime<Utc>>,

    /// End of the index window (RFC 3339) [default: now]
    #[arg(long, value_name = "TIME")]
    pub until: Option<DateTime<Utc>>,

    /// Maximum number of modules analyzed at once [default: number of CPUs]
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Config file [default: ./.modsweep/config.toml, fallback ~/.config/modsweep/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum AnalyzerArg {
    /// Count modules that `go vet` reports on
    Vet,
    /// Count modules whose dependency sources match --pattern
    Grep,
}

impl From<AnalyzerArg> for AnalyzerKind {
    fn from(arg: AnalyzerArg) -> Self {
        match arg {
            AnalyzerArg::Vet => AnalyzerKind::Vet,
            AnalyzerArg::Grep => AnalyzerKind::Grep,
        }
    }
}
