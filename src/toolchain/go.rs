use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ToolReport, Toolchain};
use crate::error::ToolError;
use crate::models::PackageId;

/// Module name written by `go mod init`; the workspace is never published.
const WORKSPACE_MODULE: &str = "modsweep.local/workspace";

/// `go list` template printing the directory of every non-standard package.
const NON_STANDARD_DIR: &str = "{{if not .Standard}}{{.Dir}}{{end}}";

/// The `go` command line tool.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
}

impl GoToolchain {
    pub fn new(go: impl Into<PathBuf>) -> Self {
        Self { go: go.into() }
    }

    fn render(&self, args: &[OsString]) -> String {
        let mut command = self.go.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(&arg.to_string_lossy());
        }
        command
    }

    /// Run `go <args>` in `dir`, returning its output whatever the exit status.
    async fn output(&self, dir: &Path, args: &[OsString]) -> Result<Output, ToolError> {
        debug!(dir = %dir.display(), command = %self.render(args), "running go");

        Command::new(&self.go)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: self.go.display().to_string(),
                source,
            })
    }

    /// Run `go <args>` in `dir` and treat a non-zero exit as an error.
    async fn run(&self, dir: &Path, args: &[OsString]) -> Result<Output, ToolError> {
        let output = self.output(dir, args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(ToolError::Failed {
                command: self.render(args),
                status: output.status,
                output: combined(&output),
            })
        }
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}

#[async_trait]
impl Toolchain for GoToolchain {
    fn marker_file(&self) -> &str {
        "go.mod"
    }

    async fn init_workspace(&self, dir: &Path) -> Result<(), ToolError> {
        self.run(dir, &args(["mod", "init", WORKSPACE_MODULE]))
            .await
            .map(drop)
    }

    async fn resolve(&self, dir: &Path, package: &PackageId) -> Result<(), ToolError> {
        self.run(dir, &args(["get".to_string(), package.selector()]))
            .await
            .map(drop)
    }

    async fn package_dirs(
        &self,
        dir: &Path,
        package: &PackageId,
    ) -> Result<Vec<PathBuf>, ToolError> {
        let list_args = args([
            "list".to_string(),
            "-deps".to_string(),
            "-f".to_string(),
            NON_STANDARD_DIR.to_string(),
            package.selector(),
        ]);
        let output = self.output(dir, &list_args).await?;
        let dirs = parse_dir_list(&String::from_utf8_lossy(&output.stdout));

        // `go list` exits non-zero when any one package fails to load but
        // still prints the directories of the others.
        if !output.status.success() {
            let err = ToolError::Failed {
                command: self.render(&list_args),
                status: output.status,
                output: combined(&output),
            };
            if dirs.is_empty() {
                return Err(err);
            }
            debug!(%package, error = %err, dirs = dirs.len(), "using partial package list");
        }

        Ok(dirs)
    }

    async fn vet(
        &self,
        dir: &Path,
        package: &PackageId,
        plugin: Option<&Path>,
    ) -> Result<ToolReport, ToolError> {
        let mut vet_args: Vec<OsString> = vec!["vet".into()];
        if let Some(plugin) = plugin {
            vet_args.push("-vettool".into());
            vet_args.push(plugin.as_os_str().to_owned());
        }
        vet_args.push(package.selector().into());

        let output = self.output(dir, &vet_args).await?;
        Ok(ToolReport {
            clean: output.status.success(),
            output: combined(&output),
        })
    }

    async fn clean(&self, dir: &Path, package: &PackageId) -> Result<(), ToolError> {
        self.run(dir, &args(["clean".to_string(), "-i".to_string(), package.selector()]))
            .await
            .map(drop)
    }
}

/// One directory per line of `go list` output; blank lines are dropped.
fn parse_dir_list(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}
