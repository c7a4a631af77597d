//! Scan orchestration: bounded fan-out, progress reporting, cancellation.
//!
//! One scan invocation owns its progress state for the duration of the call.
//! A failing candidate never aborts the scan; results are sorted
//! deterministically before returning.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::aggregate::aggregate;
use crate::domain::{
    CandidateDir, ComplianceStatus, RepoAnalysis, ScanOutcome, ScanProgress, SummaryStats,
};
use crate::error::{MenagerieError, Result};
use crate::fs::FileSystem;
use crate::locator::{detect_framework_version, locate_with_skipped};
use crate::quality::extract_quality;
use crate::structure::extract_structure;
use crate::tools::extract_tools;

/// Observer for progress snapshots during a scan.
pub trait ProgressSink: Send + Sync {
    /// Receive a consistent snapshot after a candidate completes.
    fn update(&self, snapshot: &ScanProgress);
}

/// Cooperative cancellation signal, checked between candidates.
///
/// In-flight candidates run to completion so partially-aggregated records
/// are never emitted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tunables for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum candidates analyzed concurrently.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Analyze every candidate under a scan root.
///
/// Fatal only when the root is invalid. Progress snapshots are pushed to the
/// optional sink once per completed candidate plus a final completed event.
pub async fn scan<F>(
    fs: Arc<F>,
    root: &Path,
    options: ScanOptions,
    sink: Option<Arc<dyn ProgressSink>>,
    cancel: Option<CancelFlag>,
) -> Result<ScanOutcome>
where
    F: FileSystem + Send + Sync + 'static,
{
    let (candidates, skipped) = locate_with_skipped(fs.as_ref(), root)?;
    let cancel = cancel.unwrap_or_default();

    let progress = Mutex::new(ScanProgress {
        total: candidates.len() + skipped,
        done: skipped,
        skipped,
        ..ScanProgress::default()
    });

    let concurrency = options.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let mut results = Vec::new();

    for candidate in candidates {
        if cancel.is_cancelled() {
            let mut guard = lock(&progress);
            guard.log_activity("scan cancelled");
            break;
        }

        // Drain finished tasks without blocking so progress flows while
        // later candidates are still queued on the semaphore.
        while let Some(joined) = tasks.try_join_next() {
            handle_completion(joined, &mut results, &progress, sink.as_deref());
        }

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| MenagerieError::Other(err.to_string()))?;
        {
            let mut guard = lock(&progress);
            guard.current_item = Some(candidate.name.clone());
        }
        let fs = fs.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let analysis = analyze_candidate(fs.as_ref(), &candidate);
            (candidate, analysis)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        handle_completion(joined, &mut results, &progress, sink.as_deref());
    }

    let mut seen = HashSet::new();
    results.retain(|analysis: &RepoAnalysis| seen.insert(analysis.path.clone()));
    sort_results(&mut results);

    let summary = {
        let mut guard = lock(&progress);
        guard.current_item = None;
        guard.log_activity("scan complete");
        let snapshot = guard.clone();
        drop(guard);
        if let Some(sink) = sink.as_deref() {
            sink.update(&snapshot);
        }
        summarize(&results, snapshot.skipped, snapshot.errors)
    };

    Ok(ScanOutcome { results, summary })
}

/// Analyze a single repository outside a batch scan.
///
/// Returns `None` when the directory does not declare the target framework,
/// as opposed to an error for an invalid path.
pub fn analyze_one<F: FileSystem>(fs: &F, repo_path: &Path) -> Result<Option<RepoAnalysis>> {
    if !fs.is_dir(repo_path) {
        return Err(MenagerieError::InvalidRoot(repo_path.to_path_buf()));
    }
    let Some(framework_version) = detect_framework_version(fs, repo_path) else {
        return Ok(None);
    };
    let name = repo_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("repository")
        .to_string();
    let candidate = CandidateDir {
        name,
        path: repo_path.to_path_buf(),
        framework_version,
    };
    analyze_candidate(fs, &candidate).map(Some)
}

/// Aggregate statistics over a finished result set.
pub fn summarize(results: &[RepoAnalysis], skipped: usize, errors: usize) -> SummaryStats {
    let mut summary = SummaryStats {
        analyzed: results.len(),
        skipped,
        errors,
        ..SummaryStats::default()
    };
    let mut score_total: u64 = 0;
    for analysis in results {
        score_total += u64::from(analysis.compliance_score);
        match analysis.status {
            ComplianceStatus::Sota => summary.sota += 1,
            ComplianceStatus::Improvable => summary.improvable += 1,
            ComplianceStatus::Critical => summary.critical += 1,
            ComplianceStatus::Runt => summary.runts += 1,
        }
    }
    if !results.is_empty() {
        summary.average_score = score_total as f64 / results.len() as f64;
    }
    summary
}

fn analyze_candidate<F: FileSystem>(fs: &F, candidate: &CandidateDir) -> Result<RepoAnalysis> {
    let tools = extract_tools(fs, candidate);
    let structure = extract_structure(fs, candidate);
    let quality = extract_quality(fs, candidate)?;
    Ok(aggregate(candidate, tools, structure, quality))
}

type CompletedCandidate = (CandidateDir, Result<RepoAnalysis>);

fn handle_completion(
    joined: std::result::Result<CompletedCandidate, JoinError>,
    results: &mut Vec<RepoAnalysis>,
    progress: &Mutex<ScanProgress>,
    sink: Option<&dyn ProgressSink>,
) {
    let mut guard = lock(progress);
    guard.done += 1;
    match joined {
        Ok((candidate, Ok(analysis))) => {
            guard.found += 1;
            guard.log_activity(format!(
                "analyzed {} (score {})",
                candidate.name, analysis.compliance_score
            ));
            results.push(analysis);
        }
        Ok((candidate, Err(err))) => {
            log::warn!("analysis failed for {}: {err}", candidate.name);
            guard.errors += 1;
            guard.log_activity(format!("error in {}: {err}", candidate.name));
        }
        Err(join_err) => {
            log::warn!("candidate task failed: {join_err}");
            guard.errors += 1;
            guard.log_activity(format!("candidate task failed: {join_err}"));
        }
    }
    let snapshot = guard.clone();
    drop(guard);
    if let Some(sink) = sink {
        sink.update(&snapshot);
    }
}

/// Stable ordering: most issues first, ties broken by name.
fn sort_results(results: &mut [RepoAnalysis]) {
    results.sort_by(|a, b| {
        b.reasons
            .len()
            .cmp(&a.reasons.len())
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn lock(progress: &Mutex<ScanProgress>) -> MutexGuard<'_, ScanProgress> {
    progress
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{CancelFlag, ProgressSink, ScanOptions, analyze_one, scan, summarize};
    use crate::domain::ScanProgress;
    use crate::fs::{MockFileSystem, StdFileSystem};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    const PYPROJECT: &str = "[project]\nname = \"demo\"\ndependencies = [\"fastmcp==2.1.0\"]\n";

    #[derive(Default)]
    struct RecordingSink {
        snapshots: Mutex<Vec<ScanProgress>>,
    }

    impl ProgressSink for RecordingSink {
        fn update(&self, snapshot: &ScanProgress) {
            self.snapshots
                .lock()
                .expect("sink lock")
                .push(snapshot.clone());
        }
    }

    #[tokio::test]
    async fn scan_counts_skipped_and_found() {
        let root = temp_root();
        for index in 0..6 {
            write(
                &root,
                &format!("server-{index}/pyproject.toml"),
                PYPROJECT,
            );
        }
        for index in 0..4 {
            write(
                &root,
                &format!("plain-{index}/pyproject.toml"),
                "[project]\nname = \"plain\"\n",
            );
        }

        let sink = Arc::new(RecordingSink::default());
        let outcome = scan(
            Arc::new(StdFileSystem::new()),
            &root,
            ScanOptions::default(),
            Some(sink.clone()),
            None,
        )
        .await
        .expect("scan");

        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.summary.skipped, 4);
        assert_eq!(outcome.summary.errors, 0);
        assert_eq!(outcome.summary.analyzed, 6);

        let snapshots = sink.snapshots.lock().expect("snapshots");
        // One event per completed candidate plus the final completed event.
        assert_eq!(snapshots.len(), 7);
        let done_values: Vec<usize> = snapshots.iter().map(|s| s.done).collect();
        let mut sorted = done_values.clone();
        sorted.sort();
        assert_eq!(done_values, sorted, "done counter must be monotonic");
        assert_eq!(snapshots.last().map(|s| s.done), Some(10));

        cleanup(&root);
    }

    #[tokio::test]
    async fn scan_results_are_sorted_and_unique() {
        let root = temp_root();
        write(&root, "bravo/pyproject.toml", PYPROJECT);
        write(&root, "alpha/pyproject.toml", PYPROJECT);

        let outcome = scan(
            Arc::new(StdFileSystem::new()),
            &root,
            ScanOptions { concurrency: 2 },
            None,
            None,
        )
        .await
        .expect("scan");

        let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo"]);
        let paths: Vec<&PathBuf> = outcome.results.iter().map(|r| &r.path).collect();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);

        cleanup(&root);
    }

    #[tokio::test]
    async fn failing_candidate_does_not_abort_scan() {
        let mut fs = MockFileSystem::new();
        let root = PathBuf::from("/zoo");
        let broken = PathBuf::from("/zoo/broken");
        let healthy = PathBuf::from("/zoo/healthy");

        fs.expect_is_dir()
            .returning(|path| path == Path::new("/zoo"));
        let children = vec![broken.clone(), healthy.clone()];
        fs.expect_list_dirs().returning(move |path| {
            if path == Path::new("/zoo") {
                Ok(children.clone())
            } else {
                Ok(Vec::new())
            }
        });
        fs.expect_is_file()
            .returning(|path| path.ends_with("pyproject.toml"));
        fs.expect_read_to_string().returning(|path| {
            if path.ends_with("pyproject.toml") {
                Ok(PYPROJECT.to_string())
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "missing").into())
            }
        });
        fs.expect_list_files().returning(|path| {
            if path.starts_with("/zoo/broken") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into())
            } else {
                Ok(Vec::new())
            }
        });

        let outcome = scan(
            Arc::new(fs),
            Path::new("/zoo"),
            ScanOptions { concurrency: 1 },
            None,
            None,
        )
        .await
        .expect("scan");

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].name, "healthy");
        assert_eq!(outcome.summary.errors, 1);
        assert_eq!(outcome.summary.skipped, 0);
    }

    #[tokio::test]
    async fn cancelled_scan_stops_before_spawning() {
        let root = temp_root();
        write(&root, "server/pyproject.toml", PYPROJECT);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = scan(
            Arc::new(StdFileSystem::new()),
            &root,
            ScanOptions::default(),
            None,
            Some(cancel),
        )
        .await
        .expect("scan");

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.summary.errors, 0);

        cleanup(&root);
    }

    #[tokio::test]
    async fn scan_rejects_invalid_root() {
        let missing = std::env::temp_dir().join("menagerie_scan_missing_root");
        let result = scan(
            Arc::new(StdFileSystem::new()),
            &missing,
            ScanOptions::default(),
            None,
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn analyze_one_distinguishes_absent_framework_from_bad_path() {
        let root = temp_root();
        write(&root, "pyproject.toml", PYPROJECT);
        write(&root, "server.py", "@mcp.tool()\ndef status():\n    pass\n");

        let fs = StdFileSystem::new();
        let analysis = analyze_one(&fs, &root).expect("analyze");
        let analysis = analysis.expect("target repo");
        assert_eq!(analysis.framework_version, "2.1.0");
        assert_eq!(analysis.tools.tool_count_total, 1);

        let plain = temp_root();
        write(&plain, "pyproject.toml", "[project]\nname = \"plain\"\n");
        assert!(analyze_one(&fs, &plain).expect("analyze").is_none());

        let missing = std::env::temp_dir().join("menagerie_missing_repo");
        assert!(analyze_one(&fs, &missing).is_err());

        cleanup(&root);
        cleanup(&plain);
    }

    #[test]
    fn summarize_counts_statuses_and_average() {
        let root = temp_root();
        write(&root, "pyproject.toml", PYPROJECT);

        let fs = StdFileSystem::new();
        let analysis = analyze_one(&fs, &root)
            .expect("analyze")
            .expect("target repo");
        let score = analysis.compliance_score;

        let summary = summarize(&[analysis], 3, 1);
        assert_eq!(summary.analyzed, 1);
        assert_eq!(summary.runts, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.errors, 1);
        assert!((summary.average_score - f64::from(score)).abs() < f64::EPSILON);

        cleanup(&root);
    }

    fn temp_root() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!("menagerie_scan_test_{nanos}_{counter}"));
        std::fs::create_dir_all(&root).expect("create temp root");
        root
    }

    static COUNTER: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn cleanup(root: &Path) {
        std::fs::remove_dir_all(root).expect("cleanup temp root");
    }
}
