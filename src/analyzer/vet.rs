use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::{inspect_failed, materialize};
use crate::error::TaskError;
use crate::models::{AnalysisOutcome, PackageId};
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// Runs `go vet`, optionally with a custom analysis tool, over the package.
///
/// Any diagnostic counts as a match. That includes failures unrelated to the
/// pattern being hunted, such as the package not compiling.
pub struct VetAnalyzer {
    toolchain: Arc<dyn Toolchain>,
    plugin: Option<PathBuf>,
}

impl VetAnalyzer {
    pub fn new(toolchain: Arc<dyn Toolchain>, plugin: Option<PathBuf>) -> Self {
        Self { toolchain, plugin }
    }

    pub async fn analyze(
        &self,
        workspace: &Workspace,
        package: &PackageId,
    ) -> Result<AnalysisOutcome, TaskError> {
        materialize(self.toolchain.as_ref(), workspace, package).await?;

        let report = match self
            .toolchain
            .vet(workspace.path(), package, self.plugin.as_deref())
            .await
        {
            Ok(report) => report,
            Err(e) => {
                inspect_failed(package, e);
                return Ok(AnalysisOutcome::NotMatched);
            }
        };

        if !report.clean {
            debug!(%package, output = %report.output.trim_end(), "vet reported");
        }
        Ok(AnalysisOutcome::from(!report.clean))
    }
}
