//! In-process stand-ins for the index feed and the go toolchain.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, ToolError};
use crate::index::feed::FeedSource;
use crate::models::PackageId;
use crate::toolchain::{ToolReport, Toolchain};

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn index_line(path: &str, timestamp: &str) -> String {
    format!(r#"{{"Path":"{path}","Version":"v1.0.0","Timestamp":"{timestamp}"}}"#)
}

/// Serves pre-recorded pages in order, then empty pages.
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<Result<String, String>>>,
    requested: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedFeed {
    pub fn new(pages: Vec<Result<String, String>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Cursors the pages were requested with.
    pub fn requested(&self) -> Vec<DateTime<Utc>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    fn location(&self) -> &str {
        "scripted"
    }

    async fn page(&self, since: DateTime<Utc>) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(since);
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(reason)) => Err(FetchError::FeedUnavailable {
                url: "scripted".to_string(),
                reason,
            }),
            None => Ok(String::new()),
        }
    }
}

#[derive(Default)]
struct FakeState {
    fail_init: bool,
    fail_resolve: HashSet<PackageId>,
    fail_vet: HashSet<PackageId>,
    fail_list: HashSet<PackageId>,
    vet_findings: HashSet<PackageId>,
    init_calls: usize,
    cleaned: Vec<PackageId>,
    live: HashSet<PackageId>,
    peak_live: usize,
    spans: HashMap<PackageId, (Instant, Option<Instant>)>,
}

/// A toolchain whose "dependency closures" are directories under `sources`.
///
/// A package counts as live from the start of its resolution until its
/// cleanup, which brackets the time its workspace is in use.
pub struct FakeToolchain {
    sources: PathBuf,
    delay: Duration,
    state: Mutex<FakeState>,
}

impl FakeToolchain {
    pub fn new(sources: impl Into<PathBuf>) -> Self {
        Self {
            sources: sources.into(),
            delay: Duration::ZERO,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Make every resolution take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Write a file into the synthetic source tree of `package`.
    pub fn add_source(&self, package: &PackageId, file: &str, content: &str) {
        let path = self.source_dir(package).join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn fail_init(&self) {
        self.state.lock().unwrap().fail_init = true;
    }

    pub fn fail_resolve(&self, package: &PackageId) {
        self.state.lock().unwrap().fail_resolve.insert(package.clone());
    }

    /// Make `vet` itself fail for `package`, as opposed to reporting.
    pub fn fail_vet(&self, package: &PackageId) {
        self.state.lock().unwrap().fail_vet.insert(package.clone());
    }

    /// Make listing the dependency directories of `package` fail.
    pub fn fail_list(&self, package: &PackageId) {
        self.state.lock().unwrap().fail_list.insert(package.clone());
    }

    /// Make `vet` report a finding for `package`.
    pub fn vet_finding(&self, package: &PackageId) {
        self.state.lock().unwrap().vet_findings.insert(package.clone());
    }

    pub fn init_calls(&self) -> usize {
        self.state.lock().unwrap().init_calls
    }

    pub fn cleaned(&self) -> Vec<PackageId> {
        self.state.lock().unwrap().cleaned.clone()
    }

    /// Largest number of packages live at the same time.
    pub fn peak_live(&self) -> usize {
        self.state.lock().unwrap().peak_live
    }

    /// Start and end of the live span of `package`.
    pub fn span(&self, package: &PackageId) -> Option<(Instant, Instant)> {
        let state = self.state.lock().unwrap();
        let (start, end) = state.spans.get(package)?;
        Some((*start, (*end)?))
    }

    fn source_dir(&self, package: &PackageId) -> PathBuf {
        self.sources.join(package.as_str().replace('/', "_"))
    }
}

fn refused(what: &str) -> ToolError {
    ToolError::Spawn {
        program: "fake-go".to_string(),
        source: std::io::Error::other(format!("{what} refused")),
    }
}

#[async_trait]
impl Toolchain for FakeToolchain {
    fn marker_file(&self) -> &str {
        "go.mod"
    }

    async fn init_workspace(&self, dir: &Path) -> Result<(), ToolError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_init {
                return Err(refused("init"));
            }
            state.init_calls += 1;
        }
        tokio::fs::write(dir.join("go.mod"), "module fake\n")
            .await
            .map_err(|source| ToolError::Spawn {
                program: "fake-go".to_string(),
                source,
            })
    }

    async fn resolve(&self, _dir: &Path, package: &PackageId) -> Result<(), ToolError> {
        {
            let mut state = self.state.lock().unwrap();
            state.live.insert(package.clone());
            state.peak_live = state.peak_live.max(state.live.len());
            state.spans.insert(package.clone(), (Instant::now(), None));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.state.lock().unwrap().fail_resolve.contains(package) {
            return Err(refused("resolve"));
        }
        Ok(())
    }

    async fn package_dirs(
        &self,
        _dir: &Path,
        package: &PackageId,
    ) -> Result<Vec<PathBuf>, ToolError> {
        if self.state.lock().unwrap().fail_list.contains(package) {
            return Err(refused("list"));
        }
        let dir = self.source_dir(package);
        Ok(if dir.exists() { vec![dir] } else { Vec::new() })
    }

    async fn vet(
        &self,
        _dir: &Path,
        package: &PackageId,
        _plugin: Option<&Path>,
    ) -> Result<ToolReport, ToolError> {
        let finding = {
            let state = self.state.lock().unwrap();
            if state.fail_vet.contains(package) {
                return Err(refused("vet"));
            }
            state.vet_findings.contains(package)
        };
        Ok(ToolReport {
            clean: !finding,
            output: if finding {
                format!("{package}: enum-like constant block\n")
            } else {
                String::new()
            },
        })
    }

    async fn clean(&self, _dir: &Path, package: &PackageId) -> Result<(), ToolError> {
        let mut state = self.state.lock().unwrap();
        state.live.remove(package);
        if let Some((_, end)) = state.spans.get_mut(package) {
            *end = Some(Instant::now());
        }
        state.cleaned.push(package.clone());
        Ok(())
    }
}
