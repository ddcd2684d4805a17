//! Per-package scratch directories.
//!
//! Each package gets a directory under the scratch root named by a truncated
//! SHA-256 of its module path, so concurrent tasks never share a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::models::PackageId;
use crate::toolchain::Toolchain;

/// Bytes of the digest kept in a directory name (16 hex characters).
const DIGEST_PREFIX: usize = 8;

/// A prepared directory, owned by the task analyzing one package.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

pub struct WorkspaceManager {
    root: PathBuf,
    toolchain: Arc<dyn Toolchain>,
    open: AtomicUsize,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            root: root.into(),
            toolchain,
            open: AtomicUsize::new(0),
        }
    }

    /// Directory assigned to `package`. Deterministic across runs.
    pub fn dir_for(&self, package: &PackageId) -> PathBuf {
        self.root.join(dir_name(package))
    }

    /// Number of workspaces prepared and not yet torn down.
    pub fn open_workspaces(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Create the package's directory and initialize it for the toolchain.
    ///
    /// Safe to call again for a package whose directory already exists: any
    /// leftovers from an earlier run are removed and the marker file is only
    /// created when missing. On failure nothing is left behind on disk.
    pub async fn prepare(&self, package: &PackageId) -> Result<Workspace, TaskError> {
        let dir = self.dir_for(package);
        let failed = |reason: String| TaskError::WorkspaceCreationFailed {
            package: package.clone(),
            dir: dir.clone(),
            reason,
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let marker_name = self.toolchain.marker_file();
        clear_except(&dir, marker_name)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let has_marker = tokio::fs::try_exists(dir.join(marker_name))
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !has_marker {
            if let Err(e) = self.toolchain.init_workspace(&dir).await {
                let _ = tokio::fs::remove_dir_all(&dir).await;
                return Err(failed(e.to_string()));
            }
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        debug!(%package, dir = %dir.display(), "workspace prepared");
        Ok(Workspace { dir })
    }

    /// Release the package's artifacts and delete its directory.
    ///
    /// Never fails: problems are logged and the caller carries on.
    pub async fn teardown(&self, package: &PackageId, workspace: Workspace) {
        if let Err(e) = self.toolchain.clean(&workspace.dir, package).await {
            debug!(%package, error = %e, "artifact cleanup failed");
        }

        match tokio::fs::remove_dir_all(&workspace.dir).await {
            Ok(()) => debug!(%package, "workspace removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                let err = TaskError::TeardownFailed {
                    dir: workspace.dir.clone(),
                    source,
                };
                warn!(%package, error = %err, "workspace teardown failed");
            }
        }

        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    /// Remove the scratch root if the run left it empty.
    pub async fn release_root(&self) {
        if let Err(e) = tokio::fs::remove_dir(&self.root).await {
            debug!(root = %self.root.display(), error = %e, "scratch root kept");
        }
    }
}

/// Delete every entry of `dir` except the file named `keep`.
async fn clear_except(dir: &Path, keep: &str) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_file() && entry.file_name() == keep {
            continue;
        }
        debug!(path = %entry.path().display(), "removing stale workspace entry");
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
        } else {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

fn dir_name(package: &PackageId) -> String {
    let digest = Sha256::digest(package.as_str().as_bytes());
    hex::encode(&digest[..DIGEST_PREFIX])
}
