use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A module path as published on the index, e.g. `github.com/foo/bar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<path>/...` selector handed to the go toolchain.
    pub fn selector(&self) -> String {
        format!("{}/...", self.0)
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// One line of the index feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexRecord {
    pub path: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Vet,
    Grep,
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzerKind::Vet => write!(f, "vet"),
            AnalyzerKind::Grep => write!(f, "grep"),
        }
    }
}

/// Result of an analysis that ran to completion.
///
/// A package whose workspace or dependencies could not be prepared never
/// produces an outcome; it surfaces as a [`TaskError`](crate::error::TaskError).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    NotMatched,
    Matched,
}

impl AnalysisOutcome {
    pub fn is_match(self) -> bool {
        self == AnalysisOutcome::Matched
    }
}

impl From<bool> for AnalysisOutcome {
    fn from(matched: bool) -> Self {
        if matched {
            AnalysisOutcome::Matched
        } else {
            AnalysisOutcome::NotMatched
        }
    }
}

/// Final counts of a run, available once every task has joined.
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    /// Packages handed to the scheduler.
    pub dispatched: usize,
    /// Packages whose analysis ran to completion, in completion order.
    pub attempted: Vec<PackageId>,
    /// Packages that exhibited the pattern, in completion order.
    pub matched: Vec<PackageId>,
    pub elapsed: Duration,
}

impl RunTotals {
    pub fn packages_attempted(&self) -> usize {
        self.attempted.len()
    }

    pub fn packages_matched(&self) -> usize {
        self.matched.len()
    }
}

/// Serializable summary of a run, used by the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub analyzer: AnalyzerKind,
    pub fetched: usize,
    pub dispatched: usize,
    pub attempted: usize,
    pub matched: usize,
    pub elapsed_ms: u128,
    pub matched_packages: Vec<PackageId>,
}
