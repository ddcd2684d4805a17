//! Bounded fan-out of packages to analysis tasks.
//!
//! Dispatch walks the package list in order and takes a permit from the
//! admission gate before spawning each task, so no more than
//! `max_parallelism` tasks ever hold a workspace. A task keeps its permit
//! until its workspace is torn down. Tasks finish in any order.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::aggregator::{Recorder, ResultAggregator};
use crate::analyzer::Analyzer;
use crate::models::{PackageId, RunTotals};
use crate::workspace::WorkspaceManager;

pub struct Scheduler {
    workspaces: Arc<WorkspaceManager>,
    analyzer: Arc<Analyzer>,
    max_parallelism: usize,
    progress: Option<ProgressBar>,
}

impl Scheduler {
    pub fn new(
        workspaces: Arc<WorkspaceManager>,
        analyzer: Arc<Analyzer>,
        max_parallelism: usize,
    ) -> Self {
        Self {
            workspaces,
            analyzer,
            max_parallelism: max_parallelism.max(1),
            progress: None,
        }
    }

    /// Report task completions on `progress` and print matches above it.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Analyze every package in `packages` and wait for all of them.
    ///
    /// Never fails: a package that cannot be analyzed is logged and left out
    /// of the totals.
    pub async fn run(&self, packages: &[PackageId]) -> RunTotals {
        let start = Instant::now();
        let gate = Arc::new(Semaphore::new(self.max_parallelism));
        let aggregator = ResultAggregator::new();

        info!(
            packages = packages.len(),
            max_parallelism = self.max_parallelism,
            analyzer = %self.analyzer.kind(),
            "dispatching analysis tasks"
        );

        let mut handles = Vec::with_capacity(packages.len());
        for package in packages {
            let Ok(permit) = gate.clone().acquire_owned().await else {
                break;
            };

            let task = Task {
                package: package.clone(),
                workspaces: self.workspaces.clone(),
                analyzer: self.analyzer.clone(),
                recorder: aggregator.recorder(),
                progress: self.progress.clone(),
            };
            handles.push(tokio::spawn(async move {
                task.run().await;
                drop(permit);
            }));
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "analysis task aborted");
            }
        }

        let tally = aggregator.totals().await;
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        RunTotals {
            dispatched: packages.len(),
            attempted: tally.attempted,
            matched: tally.matched,
            elapsed: start.elapsed(),
        }
    }
}

/// The first `count` packages, or all of them if there are fewer.
pub fn dispatch_prefix(packages: &[PackageId], count: usize) -> &[PackageId] {
    if count > packages.len() {
        warn!(
            requested = count,
            available = packages.len(),
            "fewer packages fetched than requested"
        );
    }
    &packages[..count.min(packages.len())]
}

struct Task {
    package: PackageId,
    workspaces: Arc<WorkspaceManager>,
    analyzer: Arc<Analyzer>,
    recorder: Recorder,
    progress: Option<ProgressBar>,
}

impl Task {
    async fn run(self) {
        let package = &self.package;

        match self.workspaces.prepare(package).await {
            Ok(workspace) => {
                match self.analyzer.analyze(&workspace, package).await {
                    Ok(outcome) => {
                        self.recorder.record_attempt(package);
                        if outcome.is_match() {
                            self.recorder.record_match(package);
                            self.announce_match();
                        } else {
                            debug!(%package, "no match");
                        }
                    }
                    Err(e) => debug!(%package, error = %e, "package skipped"),
                }
                self.workspaces.teardown(package, workspace).await;
            }
            Err(e) => debug!(%package, error = %e, "package skipped"),
        }

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    fn announce_match(&self) {
        info!(package = %self.package, "pattern matched");
        if let Some(pb) = &self.progress {
            pb.println(self.package.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::AnalyzerKind;
    use crate::test_utils::FakeToolchain;

    struct Fixture {
        _tmp: tempfile::TempDir,
        toolchain: Arc<FakeToolchain>,
        workspaces: Arc<WorkspaceManager>,
    }

    fn fixture(delay: Duration) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let toolchain =
            Arc::new(FakeToolchain::new(tmp.path().join("sources")).with_delay(delay));
        let workspaces = Arc::new(WorkspaceManager::new(
            tmp.path().join("scratch"),
            toolchain.clone(),
        ));
        Fixture {
            _tmp: tmp,
            toolchain,
            workspaces,
        }
    }

    impl Fixture {
        fn scheduler(&self, kind: AnalyzerKind, max_parallelism: usize) -> Scheduler {
            let analyzer =
                Analyzer::new(kind, self.toolchain.clone(), None, r"\benum\b").unwrap();
            Scheduler::new(self.workspaces.clone(), Arc::new(analyzer), max_parallelism)
        }
    }

    fn ids(names: &[&str]) -> Vec<PackageId> {
        names.iter().map(|n| PackageId::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_serial_grep_run_matches_one_of_two() {
        let fx = fixture(Duration::from_millis(10));
        let packages = ids(&["example.com/a", "example.com/b"]);
        fx.toolchain
            .add_source(&packages[0], "a.go", "package a\n\n// enum Shade\n");
        fx.toolchain
            .add_source(&packages[1], "b.go", "package b\n");

        let totals = fx
            .scheduler(AnalyzerKind::Grep, 1)
            .run(dispatch_prefix(&packages, 2))
            .await;

        assert_eq!(totals.packages_attempted(), 2);
        assert_eq!(totals.packages_matched(), 1);
        assert_eq!(totals.matched, vec![packages[0].clone()]);
        assert_eq!(fx.toolchain.peak_live(), 1);

        let (a_start, a_end) = fx.toolchain.span(&packages[0]).unwrap();
        let (b_start, b_end) = fx.toolchain.span(&packages[1]).unwrap();
        assert!(a_end <= b_start || b_end <= a_start);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallelism_never_exceeds_gate() {
        let fx = fixture(Duration::from_millis(20));
        let packages: Vec<PackageId> = (0..24)
            .map(|i| PackageId::new(format!("example.com/m{i}")))
            .collect();

        let totals = fx.scheduler(AnalyzerKind::Vet, 3).run(&packages).await;

        assert_eq!(totals.packages_attempted(), 24);
        assert_eq!(totals.packages_matched(), 0);
        assert!(fx.toolchain.peak_live() <= 3);
        assert!(fx.toolchain.peak_live() >= 2);
        assert_eq!(fx.workspaces.open_workspaces(), 0);
    }

    #[tokio::test]
    async fn test_resolution_failure_counts_nowhere() {
        let fx = fixture(Duration::ZERO);
        let packages = ids(&["example.com/a", "example.com/x", "example.com/b"]);
        fx.toolchain.fail_resolve(&packages[1]);
        fx.toolchain.vet_finding(&packages[1]);
        fx.toolchain.vet_finding(&packages[2]);

        let totals = fx.scheduler(AnalyzerKind::Vet, 2).run(&packages).await;

        assert_eq!(totals.dispatched, 3);
        assert_eq!(totals.packages_attempted(), 2);
        assert!(!totals.attempted.contains(&packages[1]));
        assert_eq!(totals.matched, vec![packages[2].clone()]);

        // The failed package's workspace is still torn down.
        assert!(fx.toolchain.cleaned().contains(&packages[1]));
        assert!(!fx.workspaces.dir_for(&packages[1]).exists());
    }

    #[tokio::test]
    async fn test_analysis_tool_error_counts_as_attempted_only() {
        let fx = fixture(Duration::ZERO);
        let packages = ids(&["example.com/a", "example.com/crashy"]);
        fx.toolchain.vet_finding(&packages[0]);
        fx.toolchain.vet_finding(&packages[1]);
        fx.toolchain.fail_vet(&packages[1]);

        let totals = fx.scheduler(AnalyzerKind::Vet, 2).run(&packages).await;

        assert_eq!(totals.packages_attempted(), 2);
        assert!(totals.attempted.contains(&packages[1]));
        assert_eq!(totals.matched, vec![packages[0].clone()]);
        assert!(fx.toolchain.cleaned().contains(&packages[1]));
    }

    #[tokio::test]
    async fn test_workspace_failure_skips_package() {
        let fx = fixture(Duration::ZERO);
        fx.toolchain.fail_init();
        let packages = ids(&["example.com/a", "example.com/b"]);

        let totals = fx.scheduler(AnalyzerKind::Vet, 4).run(&packages).await;

        assert_eq!(totals.dispatched, 2);
        assert_eq!(totals.packages_attempted(), 0);
        assert_eq!(totals.packages_matched(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_totals_stay_ordered_by_inclusion() {
        let fx = fixture(Duration::from_millis(2));
        let packages: Vec<PackageId> = (0..40)
            .map(|i| PackageId::new(format!("example.com/p{i}")))
            .collect();
        for (i, id) in packages.iter().enumerate() {
            match i % 4 {
                0 => fx.toolchain.vet_finding(id),
                1 => fx.toolchain.fail_resolve(id),
                _ => {}
            }
        }

        let dispatched = dispatch_prefix(&packages, 30);
        let totals = fx.scheduler(AnalyzerKind::Vet, 5).run(dispatched).await;

        assert!(totals.packages_matched() <= totals.packages_attempted());
        assert!(totals.packages_attempted() <= totals.dispatched);
        assert!(totals.dispatched <= packages.len());
        assert!(totals.matched.iter().all(|m| totals.attempted.contains(m)));
        assert_eq!(totals.packages_attempted(), 30 - 8);
        assert_eq!(totals.packages_matched(), 8);
    }

    #[test]
    fn test_dispatch_prefix_clamps() {
        let packages = ids(&["a", "b", "c"]);
        assert_eq!(dispatch_prefix(&packages, 2), &packages[..2]);
        assert_eq!(dispatch_prefix(&packages, 10), &packages[..]);
        assert!(dispatch_prefix(&packages, 0).is_empty());
    }
}
