//! Directory walker that discovers images and hands them to an indexer
//!
//! The walk is lazy and depth-first; each file whose name matches the
//! extension filter becomes an [`ImageCandidate`] submitted to an
//! [`Indexer`]. Submissions run on the walking thread or on a rayon pool
//! fed through a bounded channel.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod http;
pub mod indexer;
pub mod models;
pub mod progress;
pub mod walker;

pub use config::IndexConfig;
pub use dispatch::walk_and_index;
pub use error::{IndexError, WalkError, WalkErrorKind};
pub use filter::ExtensionFilter;
pub use http::HttpIndexer;
pub use indexer::{Indexer, LogIndexer};
pub use models::{
    FileEntry, ImageCandidate, IndexReport, SubmissionFailure, EXIT_FATAL, EXIT_PARTIAL_FAILURE,
};
pub use progress::{ProgressReporter, WalkProgress};
pub use walker::{candidates, Candidates, WalkStats};
