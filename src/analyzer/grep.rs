use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::{inspect_failed, materialize};
use crate::error::TaskError;
use crate::models::{AnalysisOutcome, PackageId};
use crate::search::first_match_in;
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// Searches the sources of the package and its dependencies for a pattern.
pub struct GrepAnalyzer {
    toolchain: Arc<dyn Toolchain>,
    pattern: Regex,
}

impl GrepAnalyzer {
    pub fn new(toolchain: Arc<dyn Toolchain>, pattern: Regex) -> Self {
        Self { toolchain, pattern }
    }

    pub async fn analyze(
        &self,
        workspace: &Workspace,
        package: &PackageId,
    ) -> Result<AnalysisOutcome, TaskError> {
        materialize(self.toolchain.as_ref(), workspace, package).await?;

        let dirs = match self.toolchain.package_dirs(workspace.path(), package).await {
            Ok(dirs) => dirs,
            Err(e) => {
                inspect_failed(package, e);
                return Ok(AnalysisOutcome::NotMatched);
            }
        };
        debug!(%package, dirs = dirs.len(), "searching dependency closure");

        let pattern = self.pattern.clone();
        let hit = match tokio::task::spawn_blocking(move || first_match_in(&dirs, &pattern)).await
        {
            Ok(hit) => hit,
            Err(e) => {
                inspect_failed(package, e);
                return Ok(AnalysisOutcome::NotMatched);
            }
        };

        if let Some(hit) = &hit {
            debug!(
                %package,
                file = %hit.path.display(),
                line = hit.line,
                text = %hit.text.trim(),
                "pattern found"
            );
        }
        Ok(AnalysisOutcome::from(hit.is_some()))
    }
}
