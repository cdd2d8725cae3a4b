//! Core data models for the image indexer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::WalkError;

/// Exit code of a run where some directory or submission failed
pub const EXIT_PARTIAL_FAILURE: u8 = 1;

/// Exit code of a run whose root could not be walked
pub const EXIT_FATAL: u8 = 2;

/// A file observed during traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Directory holding the file
    pub dir: PathBuf,
    /// File name without directory, exactly as stored on disk
    pub name: OsString,
}

impl FileEntry {
    /// Create a new entry
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<OsString>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Split a full path into directory and file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_os_string();
        let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        Some(Self { dir, name })
    }

    /// Full path to the file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// A file entry recognized as an image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Root the walk started from
    pub root: PathBuf,
    /// The underlying file entry
    pub entry: FileEntry,
}

impl ImageCandidate {
    /// Create a candidate for an entry found under `root`
    pub fn new(root: impl Into<PathBuf>, entry: FileEntry) -> Self {
        Self {
            root: root.into(),
            entry,
        }
    }

    /// Full path to the image
    pub fn path(&self) -> PathBuf {
        self.entry.path()
    }

    /// Path relative to the walk root
    pub fn relative_path(&self) -> PathBuf {
        let path = self.path();
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path,
        }
    }

    /// File name of the image, lossily converted for display
    pub fn name(&self) -> Cow<'_, str> {
        self.entry.name.to_string_lossy()
    }
}

/// A submission the indexer refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFailure {
    /// Image that failed
    pub path: PathBuf,
    /// Error message from the indexer
    pub message: String,
}

/// Summary of one walk-and-index run
#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    /// Root that was walked
    pub root: PathBuf,
    /// When the run started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the run finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Directories visited, root included
    pub dirs_visited: u64,
    /// Files seen, images or not
    pub files_seen: u64,
    /// Files matching the extension filter
    pub candidates: u64,
    /// Successful submissions
    pub submitted: u64,
    /// Failed submissions
    pub failed: u64,
    /// Directories that could not be read
    pub unreadable_dirs: u64,
    /// Failed submissions in detail
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SubmissionFailure>,
    /// Traversal errors
    #[serde(skip)]
    pub errors: Vec<WalkError>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl IndexReport {
    /// Create a new empty report for `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Get the number of traversal errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Check if every directory was read and every submission succeeded
    pub fn is_success(&self) -> bool {
        self.unreadable_dirs == 0 && self.failed == 0
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            EXIT_PARTIAL_FAILURE
        }
    }
}
