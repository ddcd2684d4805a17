//! The external toolchain the workspaces and analyzers drive.
//!
//! Every subprocess the pipeline runs goes through [`Toolchain`], which keeps
//! the process recipes in one place ([`go::GoToolchain`]) and lets tests swap
//! in a toolchain that never leaves the process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ToolError;
use crate::models::PackageId;

pub mod go;

/// Exit status and combined output of an analysis tool run.
#[derive(Debug, Clone)]
pub struct ToolReport {
    pub clean: bool,
    pub output: String,
}

#[async_trait]
pub trait Toolchain: Send + Sync {
    /// File that marks a directory as an initialized workspace.
    fn marker_file(&self) -> &str;

    /// Initialize `dir` so dependencies can be resolved into it.
    async fn init_workspace(&self, dir: &Path) -> Result<(), ToolError>;

    /// Materialize the dependency closure of `package` inside `dir`.
    async fn resolve(&self, dir: &Path, package: &PackageId) -> Result<(), ToolError>;

    /// On-disk source directories of `package` and everything it depends on.
    async fn package_dirs(&self, dir: &Path, package: &PackageId)
        -> Result<Vec<PathBuf>, ToolError>;

    /// Run the static-analysis tool over `package`, with an optional plugin.
    async fn vet(
        &self,
        dir: &Path,
        package: &PackageId,
        plugin: Option<&Path>,
    ) -> Result<ToolReport, ToolError>;

    /// Release build and module artifacts resolved for `package`.
    async fn clean(&self, dir: &Path, package: &PackageId) -> Result<(), ToolError>;
}
