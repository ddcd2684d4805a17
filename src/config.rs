use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::AnalyzerKind;

/// Root configuration structure, deserialized from `.modsweep/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub workspace: WorkspaceConfig,
    pub toolchain: ToolchainConfig,
    pub search: SearchConfig,
}

/// Where the module index is read from.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://index.golang.org/index".to_string(),
            timeout_secs: 30,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory under which per-package workspaces are created.
    pub scratch_root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from("tmpdir"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// The `go` binary to invoke.
    pub go: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: PathBuf::from("go"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Regular expression used by the grep analyzer when `--pattern` is absent.
    pub pattern: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: r"\benum\b".to_string(),
        }
    }
}

/// Load configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `./.modsweep/config.toml`
/// 3. `~/.config/modsweep/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(cwd: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local = cwd.join(".modsweep").join("config.toml");
    if local.exists() {
        return read_config(&local);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("modsweep").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

/// Everything the pipeline needs for one run, after CLI flags have been
/// merged over the configuration file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub analyzer: AnalyzerKind,
    /// Custom vet tool, only used by the vet analyzer.
    pub tool_path: Option<PathBuf>,
    /// Search pattern, only used by the grep analyzer.
    pub pattern: String,
    pub dispatch_count: usize,
    pub max_parallelism: usize,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.since > self.until {
            bail!(
                "--since ({}) is after --until ({})",
                self.since.to_rfc3339(),
                self.until.to_rfc3339()
            );
        }
        if self.max_parallelism == 0 {
            bail!("--jobs must be at least 1");
        }
        Ok(())
    }
}
