//! The indexing capability the walker dispatches to

use crate::error::IndexError;
use crate::models::ImageCandidate;

/// Registers images with an external index.
///
/// `submit` may be slow; with more than one worker it is called from several
/// threads at once, hence the `Send + Sync` bound.
pub trait Indexer: Send + Sync {
    /// Register one image
    fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError>;
}

impl<T: Indexer + ?Sized> Indexer for Box<T> {
    fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError> {
        (**self).submit(candidate)
    }
}

impl<T: Indexer + ?Sized> Indexer for std::sync::Arc<T> {
    fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError> {
        (**self).submit(candidate)
    }
}

/// Dry-run indexer: logs every image and accepts it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndexer;

impl Indexer for LogIndexer {
    fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError> {
        log::info!("Would index {}", candidate.path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileEntry;
    use std::sync::Arc;

    #[test]
    fn test_log_indexer_accepts_everything() {
        let candidate = ImageCandidate::new("/images", FileEntry::new("/images/a", "img1.png"));
        assert!(LogIndexer.submit(&candidate).is_ok());
    }

    #[test]
    fn test_boxed_and_shared_indexers() {
        let candidate = ImageCandidate::new("/images", FileEntry::new("/images", "x.gif"));
        let boxed: Box<dyn Indexer> = Box::new(LogIndexer);
        let shared: Arc<dyn Indexer> = Arc::new(LogIndexer);
        assert!(boxed.submit(&candidate).is_ok());
        assert!(shared.submit(&candidate).is_ok());
    }
}
