//! Walker module - lazy depth-first discovery of image candidates

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::IndexConfig;
use crate::error::WalkError;
use crate::models::{FileEntry, ImageCandidate};

type EntryFilter<'a> = Box<dyn FnMut(&DirEntry) -> bool + Send + 'a>;
type EntryHook<'a> = Box<dyn FnMut(&WalkStats, &Path) + 'a>;

/// Counters kept while walking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories visited, root included
    pub dirs_visited: u64,
    /// Non-directory entries seen
    pub files_seen: u64,
    /// Entries matching the extension filter
    pub candidates: u64,
    /// Entries or directories that could not be read
    pub unreadable: u64,
}

/// Lazy sequence of image candidates under a root.
///
/// Yields `Err` for every directory or entry that could not be read; those
/// are recoverable and the walk goes on with the next sibling.
pub struct Candidates<'a> {
    config: &'a IndexConfig,
    inner: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter<'a>>,
    stats: WalkStats,
    current_dir: PathBuf,
    on_entry: Option<EntryHook<'a>>,
}

impl std::fmt::Debug for Candidates<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidates")
            .field("root", &self.config.root)
            .field("stats", &self.stats)
            .field("current_dir", &self.current_dir)
            .finish()
    }
}

/// Start walking `config.root`.
///
/// The root is checked eagerly: a missing, unreadable or non-directory root
/// fails here, before any candidate is produced.
pub fn candidates(config: &IndexConfig) -> Result<Candidates<'_>, WalkError> {
    check_root(&config.root)?;

    let mut walker = WalkDir::new(&config.root)
        .follow_links(config.follow_links)
        .sort_by_file_name();
    if let Some(depth) = config.max_depth {
        walker = walker.max_depth(depth);
    }

    let filter: EntryFilter<'_> = Box::new(move |entry: &DirEntry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        match entry.file_name().to_str() {
            Some(name) => !config.should_ignore_dir(name),
            None => true,
        }
    });

    Ok(Candidates {
        config,
        inner: walker.into_iter().filter_entry(filter),
        stats: WalkStats::default(),
        current_dir: config.root.clone(),
        on_entry: None,
    })
}

/// Make sure the root exists, is a directory and can be listed
pub fn check_root(root: &Path) -> Result<(), WalkError> {
    let metadata = fs::metadata(root).map_err(|e| WalkError::from_io(root, &e))?;
    if !metadata.is_dir() {
        return Err(WalkError::not_a_directory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|e| WalkError::from_io(root, &e))?;
    Ok(())
}

impl<'a> Candidates<'a> {
    /// Call `hook` after every entry the walk handles, whether or not it
    /// turns into a candidate
    pub fn on_entry(mut self, hook: impl FnMut(&WalkStats, &Path) + 'a) -> Self {
        self.on_entry = Some(Box::new(hook));
        self
    }

    /// Counters so far
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Most recently entered directory
    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }
}

impl Iterator for Candidates<'_> {
    type Item = Result<ImageCandidate, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.inner.next()?;
            let produced = self.visit(item);
            if let Some(hook) = self.on_entry.as_mut() {
                hook(&self.stats, &self.current_dir);
            }
            if produced.is_some() {
                return produced;
            }
        }
    }
}

impl Candidates<'_> {
    fn visit(
        &mut self,
        item: walkdir::Result<DirEntry>,
    ) -> Option<Result<ImageCandidate, WalkError>> {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                self.stats.unreadable += 1;
                return Some(Err(WalkError::from(err)));
            }
        };

        if entry.file_type().is_dir() {
            self.stats.dirs_visited += 1;
            self.current_dir = entry.path().to_path_buf();
            log::debug!("Found directory: {}", entry.path().display());
            return None;
        }

        self.stats.files_seen += 1;
        let name = entry.file_name().to_string_lossy();
        log::trace!("\t{}", name);
        if !self.config.extensions.matches(&name) {
            return None;
        }

        let file = FileEntry::from_path(entry.path())?;
        self.stats.candidates += 1;
        Some(Ok(ImageCandidate::new(self.config.root.clone(), file)))
    }
}
