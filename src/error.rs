//! Error types for the fetch stage, per-package tasks, and toolchain calls.
//!
//! Fetch errors abort the run before anything is scheduled. Task errors stay
//! inside the task that raised them and only ever show up in the logs and in
//! the final counts.

use std::path::PathBuf;
use std::process::ExitStatus;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::PackageId;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("index feed unavailable at {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("malformed index record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("index feed stalled: cursor did not advance past {cursor}")]
    FeedStalled { cursor: DateTime<Utc> },
}

/// Failure of a single external toolchain invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("could not prepare workspace {dir} for {package}: {reason}")]
    WorkspaceCreationFailed {
        package: PackageId,
        dir: PathBuf,
        reason: String,
    },

    #[error("dependency resolution failed for {package}: {source}")]
    DependencyResolutionFailed {
        package: PackageId,
        #[source]
        source: ToolError,
    },

    #[error("analysis tool error for {package}: {reason}")]
    AnalysisToolError { package: PackageId, reason: String },

    #[error("teardown of {dir} failed: {source}")]
    TeardownFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
