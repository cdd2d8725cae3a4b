//! Configuration for the image indexer

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::filter::ExtensionFilter;

/// Root scanned when none is given (the mount point of the image volume)
pub const DEFAULT_ROOT: &str = "/images";

/// Default bound of the queue between walker and submitters
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default number of submitters
pub const DEFAULT_WORKERS: usize = 1;

/// Default minimum interval between progress events
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Configuration for a walk-and-index run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Root directory to walk
    pub root: PathBuf,

    /// Suffixes identifying image files
    pub extensions: ExtensionFilter,

    /// Directory names pruned from the walk
    pub ignore_dirs: HashSet<String>,

    /// Follow symbolic links. Cycles are reported by walkdir as errors.
    pub follow_links: bool,

    /// Maximum depth below the root, `None` for unlimited
    pub max_depth: Option<usize>,

    /// Number of concurrent submitters
    /// 1 submits on the walking thread, 0 means auto-detect
    pub workers: usize,

    /// Capacity of the bounded candidate queue
    pub queue_capacity: usize,

    /// Minimum interval between progress events in milliseconds
    pub progress_interval_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            extensions: ExtensionFilter::images(),
            ignore_dirs: HashSet::new(),
            follow_links: false,
            max_depth: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
        }
    }
}

impl IndexConfig {
    /// Create a new config for the given root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }

    /// Check if a directory should be pruned
    pub fn should_ignore_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }

    /// Get the effective number of submitters
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.workers
        }
    }

    /// Queue capacity, never zero
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

/// Builder for IndexConfig
#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the extension filter
    pub fn extensions(mut self, extensions: ExtensionFilter) -> Self {
        self.config.extensions = extensions;
        self
    }

    /// Set the directories to prune
    pub fn ignore_dirs(mut self, dirs: HashSet<String>) -> Self {
        self.config.ignore_dirs = dirs;
        self
    }

    /// Add a directory to prune
    pub fn add_ignore_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.ignore_dirs.insert(dir.into());
        self
    }

    /// Enable or disable following symbolic links
    pub fn follow_links(mut self, enabled: bool) -> Self {
        self.config.follow_links = enabled;
        self
    }

    /// Limit the walk depth
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the number of submitters
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the progress interval
    pub fn progress_interval_ms(mut self, interval: u64) -> Self {
        self.config.progress_interval_ms = interval;
        self
    }

    /// Build the config
    pub fn build(self) -> IndexConfig {
        self.config
    }
}
