//! Progress reporting module for walk-and-index runs
//!
//! The reporter is the structured observability sink of a run: it writes
//! one JSON object per line to an injected writer (stderr by default).

use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::config::IndexConfig;
use crate::error::WalkError;
use crate::models::{IndexReport, SubmissionFailure};

/// Snapshot of a run in progress
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    /// Directories visited so far
    pub dirs: u64,
    /// Files seen so far
    pub files: u64,
    /// Image candidates found so far
    pub candidates: u64,
    /// Successful submissions so far
    pub submitted: u64,
    /// Failed submissions so far
    pub failed: u64,
    /// Directory being walked
    pub current_dir: String,
    /// Elapsed time in milliseconds
    pub elapsed_ms: u64,
}

/// Start message sent when the run begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Root being walked
    pub root: String,
    /// Extension suffixes in use
    pub extensions: Vec<String>,
    /// Number of submitters
    pub workers: usize,
    /// Whether symbolic links are followed
    pub follow_links: bool,
}

impl StartMessage {
    /// Create a new start message
    pub fn new(
        seq: u64,
        ts: u64,
        root: String,
        extensions: Vec<String>,
        workers: usize,
        follow_links: bool,
    ) -> Self {
        Self {
            msg_type: "start",
            seq,
            ts,
            root,
            extensions,
            workers,
            follow_links,
        }
    }
}

/// Progress message sent during the walk
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Directories visited
    #[serde(rename = "d")]
    pub dirs: u64,
    /// Files seen
    #[serde(rename = "f")]
    pub files: u64,
    /// Image candidates found
    #[serde(rename = "c")]
    pub candidates: u64,
    /// Successful submissions
    #[serde(rename = "ok")]
    pub submitted: u64,
    /// Failed submissions
    #[serde(rename = "fail")]
    pub failed: u64,
    /// Current directory
    pub dir: String,
    /// Elapsed time in milliseconds
    pub ms: u64,
}

impl ProgressMessage {
    /// Create a progress message from a snapshot
    pub fn new(seq: u64, ts: u64, progress: &WalkProgress) -> Self {
        Self {
            msg_type: "p",
            seq,
            ts,
            dirs: progress.dirs,
            files: progress.files,
            candidates: progress.candidates,
            submitted: progress.submitted,
            failed: progress.failed,
            dir: progress.current_dir.clone(),
            ms: progress.elapsed_ms,
        }
    }
}

/// Error message sent when a directory is skipped or a submission fails
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProgressMessage {
    /// Message type identifier ("err" for error)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Error type/category
    pub error_type: String,
    /// Error message description
    pub message: String,
    /// Path that caused the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorProgressMessage {
    /// Create a new error progress message
    pub fn new(
        seq: u64,
        ts: u64,
        error_type: String,
        message: String,
        path: Option<String>,
    ) -> Self {
        Self {
            msg_type: "err",
            seq,
            ts,
            error_type,
            message,
            path,
        }
    }
}

/// Done message sent when the run completes
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage {
    /// Message type identifier ("done" for completion)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Directories visited
    #[serde(rename = "td")]
    pub dirs: u64,
    /// Files seen
    #[serde(rename = "tf")]
    pub files: u64,
    /// Image candidates found
    #[serde(rename = "tc")]
    pub candidates: u64,
    /// Successful submissions
    #[serde(rename = "ok")]
    pub submitted: u64,
    /// Failed submissions
    #[serde(rename = "fail")]
    pub failed: u64,
    /// Unreadable directories
    #[serde(rename = "ud")]
    pub unreadable_dirs: u64,
    /// Total duration in milliseconds
    pub ms: u64,
}

impl DoneMessage {
    /// Create a done message from the final report
    pub fn new(seq: u64, ts: u64, report: &IndexReport) -> Self {
        Self {
            msg_type: "done",
            seq,
            ts,
            dirs: report.dirs_visited,
            files: report.files_seen,
            candidates: report.candidates,
            submitted: report.submitted,
            failed: report.failed,
            unreadable_dirs: report.unreadable_dirs,
            ms: report.duration_ms,
        }
    }
}

/// Progress reporter writing JSON lines to a sink
///
/// Safe to share between the walker and the submitters. Progress messages
/// are rate limited; start, error and done messages always go out.
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Reporting interval in milliseconds
    interval_ms: u64,
    /// Timestamp of the last progress message
    last_report_ms: AtomicU64,
    /// Sequence number for messages
    seq: AtomicU64,
    /// Start time of the reporter
    start_time: Instant,
    /// Where messages are written
    sink: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.enabled)
            .field("interval_ms", &self.interval_ms)
            .finish_non_exhaustive()
    }
}

impl ProgressReporter {
    /// Create a reporter writing to stderr
    ///
    /// # Arguments
    /// * `enabled` - Whether progress reporting is enabled
    /// * `interval_ms` - Minimum interval between progress messages in milliseconds
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        Self::with_sink(enabled, interval_ms, Box::new(std::io::stderr()))
    }

    /// Create a reporter writing to `sink`
    pub fn with_sink(enabled: bool, interval_ms: u64, sink: Box<dyn Write + Send>) -> Self {
        Self {
            enabled,
            interval_ms,
            last_report_ms: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            start_time: Instant::now(),
            sink: Mutex::new(sink),
        }
    }

    /// A reporter that never writes
    pub fn disabled() -> Self {
        Self::with_sink(false, u64::MAX, Box::new(std::io::sink()))
    }

    /// Check if enough time has passed since the last progress message
    pub fn should_report(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let now = self.current_timestamp();
        now.saturating_sub(self.last_report_ms.load(Ordering::Relaxed)) >= self.interval_ms
    }

    /// Get the next sequence number (monotonically increasing)
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current timestamp in milliseconds since reporter creation
    pub fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Write a serializable message as one JSON line
    pub fn emit<T: Serialize>(&self, msg: &T) {
        let Ok(json) = serde_json::to_string(msg) else {
            return;
        };
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if writeln!(sink, "{}", json).and_then(|_| sink.flush()).is_err() {
            log::debug!("Progress sink rejected a message");
        }
    }

    /// Report the start of a run
    pub fn report_start(&self, config: &IndexConfig) {
        if !self.enabled {
            return;
        }

        let msg = StartMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            config.root.to_string_lossy().to_string(),
            config.extensions.suffixes().map(str::to_string).collect(),
            config.effective_workers(),
            config.follow_links,
        );
        self.emit(&msg);
    }

    /// Report progress, respecting the interval.
    /// Returns true if a message was actually sent.
    pub fn report_progress(&self, progress: &WalkProgress) -> bool {
        if !self.should_report() {
            return false;
        }

        let ts = self.current_timestamp();
        let msg = ProgressMessage::new(self.next_seq(), ts, progress);
        self.emit(&msg);
        self.last_report_ms.store(ts, Ordering::Relaxed);
        true
    }

    /// Report a skipped directory or entry
    pub fn report_error(&self, error: &WalkError) {
        if !self.enabled {
            return;
        }

        let msg = ErrorProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            format!("{:?}", error.kind),
            error.message.clone(),
            error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        );
        self.emit(&msg);
    }

    /// Report a failed submission
    pub fn report_failure(&self, failure: &SubmissionFailure) {
        if !self.enabled {
            return;
        }

        let msg = ErrorProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            "SubmitFailed".to_string(),
            failure.message.clone(),
            Some(failure.path.to_string_lossy().to_string()),
        );
        self.emit(&msg);
    }

    /// Report the end of a run
    pub fn report_done(&self, report: &IndexReport) {
        if !self.enabled {
            return;
        }

        let msg = DoneMessage::new(self.next_seq(), self.current_timestamp(), report);
        self.emit(&msg);
    }
}
