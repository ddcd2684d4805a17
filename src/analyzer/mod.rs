//! The analyses a package can be put through.
//!
//! Both variants run in two phases. *Materialize* resolves the package's
//! dependency closure into its workspace; a failure there means the package
//! was never analyzed. *Inspect* then looks for the pattern; its failures
//! are logged and read as "no match".

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::error::TaskError;
use crate::models::{AnalysisOutcome, AnalyzerKind, PackageId};
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

pub mod grep;
pub mod vet;

pub use grep::GrepAnalyzer;
pub use vet::VetAnalyzer;

pub enum Analyzer {
    Vet(VetAnalyzer),
    Grep(GrepAnalyzer),
}

impl Analyzer {
    /// Build the analyzer selected by `kind`.
    ///
    /// `plugin` only applies to [`AnalyzerKind::Vet`] and `pattern` only to
    /// [`AnalyzerKind::Grep`]; an invalid pattern is rejected here rather
    /// than once per package.
    pub fn new(
        kind: AnalyzerKind,
        toolchain: Arc<dyn Toolchain>,
        plugin: Option<PathBuf>,
        pattern: &str,
    ) -> Result<Self> {
        Ok(match kind {
            AnalyzerKind::Vet => Analyzer::Vet(VetAnalyzer::new(toolchain, plugin)),
            AnalyzerKind::Grep => {
                let pattern = Regex::new(pattern)
                    .with_context(|| format!("invalid search pattern `{pattern}`"))?;
                Analyzer::Grep(GrepAnalyzer::new(toolchain, pattern))
            }
        })
    }

    pub fn kind(&self) -> AnalyzerKind {
        match self {
            Analyzer::Vet(_) => AnalyzerKind::Vet,
            Analyzer::Grep(_) => AnalyzerKind::Grep,
        }
    }

    pub async fn analyze(
        &self,
        workspace: &Workspace,
        package: &PackageId,
    ) -> Result<AnalysisOutcome, TaskError> {
        match self {
            Analyzer::Vet(a) => a.analyze(workspace, package).await,
            Analyzer::Grep(a) => a.analyze(workspace, package).await,
        }
    }
}

/// Resolve the dependency closure of `package` into `workspace`.
async fn materialize(
    toolchain: &dyn Toolchain,
    workspace: &Workspace,
    package: &PackageId,
) -> Result<(), TaskError> {
    toolchain
        .resolve(workspace.path(), package)
        .await
        .map_err(|source| TaskError::DependencyResolutionFailed {
            package: package.clone(),
            source,
        })?;
    debug!(%package, "dependencies resolved");
    Ok(())
}

/// Log an inspect-phase failure; the caller then reports no match.
fn inspect_failed(package: &PackageId, reason: impl ToString) {
    let err = TaskError::AnalysisToolError {
        package: package.clone(),
        reason: reason.to_string(),
    };
    debug!(error = %err, "treating as no match");
}
