//! Dispatcher - feeds discovered images to an indexer
//!
//! With one worker every candidate is submitted on the walking thread. With
//! more, the walker pushes into a bounded channel drained by a rayon pool, so
//! a slow indexer throttles the walk instead of piling up candidates.

use chrono::Utc;
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::IndexConfig;
use crate::error::WalkError;
use crate::indexer::Indexer;
use crate::models::{ImageCandidate, IndexReport, SubmissionFailure};
use crate::progress::{ProgressReporter, WalkProgress};
use crate::walker::{self, Candidates, WalkStats};

/// Submission counters shared by all workers
#[derive(Debug, Default)]
struct Tally {
    submitted: AtomicU64,
    failed: AtomicU64,
    failures: Mutex<Vec<SubmissionFailure>>,
}

impl Tally {
    fn submit<I: Indexer + ?Sized>(
        &self,
        indexer: &I,
        candidate: &ImageCandidate,
        reporter: &ProgressReporter,
    ) {
        match indexer.submit(candidate) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log::warn!("Failed to index {}: {}", candidate.path().display(), e);
                let failure = SubmissionFailure {
                    path: candidate.path(),
                    message: e.to_string(),
                };
                reporter.report_failure(&failure);
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.failures
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(failure);
            }
        }
    }
}

/// Walk `config.root` and submit every image to `indexer`.
///
/// Fails only when the root itself cannot be walked, and then before any
/// submission. Unreadable subdirectories and failed submissions are logged,
/// counted in the report, and do not stop the walk.
pub fn walk_and_index<I: Indexer + ?Sized>(
    config: &IndexConfig,
    indexer: &I,
    reporter: &ProgressReporter,
) -> Result<IndexReport, WalkError> {
    let started_at = Utc::now();
    let start = Instant::now();
    let tally = Tally::default();
    let mut candidates = walker::candidates(config)?.on_entry(|stats: &WalkStats, dir: &Path| {
        report_progress(reporter, &tally, stats, dir, start)
    });
    reporter.report_start(config);

    let mut errors = Vec::new();
    let workers = config.effective_workers();

    if workers <= 1 {
        drive(&mut candidates, &mut errors, reporter, |candidate| {
            tally.submit(indexer, &candidate, reporter);
            true
        });
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("indexer-{}", i))
            .build()
        {
            Ok(pool) => {
                let (tx, rx) = bounded::<ImageCandidate>(config.effective_queue_capacity());
                pool.in_place_scope(|scope| {
                    for _ in 0..workers {
                        let rx = rx.clone();
                        let tally = &tally;
                        scope.spawn(move |_| {
                            for candidate in rx.iter() {
                                tally.submit(indexer, &candidate, reporter);
                            }
                        });
                    }
                    drop(rx);

                    drive(&mut candidates, &mut errors, reporter, |candidate| {
                        tx.send(candidate).is_ok()
                    });
                    drop(tx);
                });
            }
            Err(e) => {
                log::warn!("Cannot start {} workers ({}), submitting sequentially", workers, e);
                drive(&mut candidates, &mut errors, reporter, |candidate| {
                    tally.submit(indexer, &candidate, reporter);
                    true
                });
            }
        }
    }

    let stats = candidates.stats();
    drop(candidates);
    let mut failures = tally.failures.into_inner().unwrap_or_else(|e| e.into_inner());
    failures.sort_by(|a, b| a.path.cmp(&b.path));

    let report = IndexReport {
        root: config.root.clone(),
        started_at: Some(started_at),
        finished_at: Some(Utc::now()),
        dirs_visited: stats.dirs_visited,
        files_seen: stats.files_seen,
        candidates: stats.candidates,
        submitted: tally.submitted.load(Ordering::Relaxed),
        failed: tally.failed.load(Ordering::Relaxed),
        unreadable_dirs: stats.unreadable,
        failures,
        errors,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    reporter.report_done(&report);
    Ok(report)
}

/// Pull candidates off the walk and hand them to `dispatch` until the walk
/// ends or `dispatch` returns false.
fn drive(
    candidates: &mut Candidates<'_>,
    errors: &mut Vec<WalkError>,
    reporter: &ProgressReporter,
    mut dispatch: impl FnMut(ImageCandidate) -> bool,
) {
    for item in candidates {
        match item {
            Ok(candidate) => {
                if !dispatch(candidate) {
                    log::error!("All workers stopped, abandoning the walk");
                    break;
                }
            }
            Err(e) => {
                log::warn!("Skipping unreadable path: {}", e);
                reporter.report_error(&e);
                errors.push(e);
            }
        }
    }
}

/// Emit a progress event if the reporter's interval has passed
fn report_progress(
    reporter: &ProgressReporter,
    tally: &Tally,
    stats: &WalkStats,
    dir: &Path,
    start: Instant,
) {
    if !reporter.should_report() {
        return;
    }
    reporter.report_progress(&WalkProgress {
        dirs: stats.dirs_visited,
        files: stats.files_seen,
        candidates: stats.candidates,
        submitted: tally.submitted.load(Ordering::Relaxed),
        failed: tally.failed.load(Ordering::Relaxed),
        current_dir: dir.to_string_lossy().to_string(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, WalkErrorKind};
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::TempDir;

    /// Indexer recording every call, rejecting names containing "bad"
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Indexer for Recorder {
        fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError> {
            self.seen
                .lock()
                .unwrap()
                .push(candidate.relative_path().to_string_lossy().into_owned());
            if candidate.name().contains("bad") {
                return Err(IndexError::Rejected {
                    status: 500,
                    body: "nope".to_string(),
                });
            }
            Ok(())
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_missing_root_submits_nothing() {
        let recorder = Recorder::default();
        let config = IndexConfig::new("/no/such/images");
        let err = walk_and_index(&config, &recorder, &ProgressReporter::disabled()).unwrap_err();
        assert_eq!(err.kind, WalkErrorKind::NotFound);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failures_do_not_stop_the_walk() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/bad.png");
        touch(dir.path(), "a/good.png");
        touch(dir.path(), "b/also_good.jpg");

        let recorder = Recorder::default();
        let config = IndexConfig::new(dir.path());
        let report = walk_and_index(&config, &recorder, &ProgressReporter::disabled()).unwrap();

        assert_eq!(recorder.seen.lock().unwrap().len(), 3);
        assert_eq!(report.candidates, 3);
        assert_eq!(report.submitted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("a/bad.png"));
        assert!(!report.is_success());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        for i in 0..40 {
            touch(dir.path(), &format!("d{}/img{}.png", i % 7, i));
            touch(dir.path(), &format!("d{}/note{}.txt", i % 5, i));
        }

        let recorder = Recorder::default();
        let config = IndexConfig::builder()
            .root(dir.path())
            .workers(4)
            .queue_capacity(2)
            .build();
        let report = walk_and_index(&config, &recorder, &ProgressReporter::disabled()).unwrap();

        let mut seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 40);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 40);
        assert_eq!(report.submitted, 40);
        assert_eq!(report.files_seen, 80);
        assert!(report.is_success());
    }

    /// Writer that keeps everything in a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_progress_reported_without_images() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            touch(dir.path(), &format!("d{}/notes.txt", i));
        }

        let buf = SharedBuf::default();
        let reporter = ProgressReporter::with_sink(true, 0, Box::new(buf.clone()));
        let config = IndexConfig::new(dir.path());
        let report = walk_and_index(&config, &Recorder::default(), &reporter).unwrap();
        assert_eq!(report.candidates, 0);

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let progress: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .filter(|v| v["_t"] == "p")
            .collect();
        assert!(!progress.is_empty());
        assert_eq!(progress.last().unwrap()["f"], 20);
    }

    #[test]
    fn test_report_timestamps() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(dir.path());
        let report =
            walk_and_index(&config, &Recorder::default(), &ProgressReporter::disabled()).unwrap();
        let started = report.started_at.unwrap();
        let finished = report.finished_at.unwrap();
        assert!(finished >= started);
        assert_eq!(report.dirs_visited, 1);
        assert_eq!(report.submitted, 0);
    }
}
