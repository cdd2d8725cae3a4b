//! Error types for the image indexer

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error kinds that can occur while walking the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkErrorKind {
    /// Permission denied when reading a directory
    PermissionDenied,
    /// Directory not found
    NotFound,
    /// The root path exists but is not a directory
    NotADirectory,
    /// Any other I/O failure
    IoError,
}

impl WalkErrorKind {
    /// Classify an I/O error
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => WalkErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => WalkErrorKind::NotFound,
            _ => WalkErrorKind::IoError,
        }
    }
}

/// Represents an error that occurred while walking
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct WalkError {
    /// The kind of error
    pub kind: WalkErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl WalkError {
    /// Create a new walk error
    pub fn new(kind: WalkErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::new(
            WalkErrorKind::PermissionDenied,
            Some(path.clone()),
            format!("Permission denied: {:?}", path),
        )
    }

    /// Create a not found error
    pub fn not_found(path: PathBuf) -> Self {
        Self::new(
            WalkErrorKind::NotFound,
            Some(path.clone()),
            format!("Not found: {:?}", path),
        )
    }

    /// Create a not-a-directory error
    pub fn not_a_directory(path: PathBuf) -> Self {
        Self::new(
            WalkErrorKind::NotADirectory,
            Some(path.clone()),
            format!("Not a directory: {:?}", path),
        )
    }

    /// Create an error from an I/O failure at `path`
    pub fn from_io(path: &Path, err: &std::io::Error) -> Self {
        match WalkErrorKind::from_io(err) {
            WalkErrorKind::PermissionDenied => Self::permission_denied(path.to_path_buf()),
            WalkErrorKind::NotFound => Self::not_found(path.to_path_buf()),
            kind => Self::new(kind, Some(path.to_path_buf()), err.to_string()),
        }
    }
}

impl From<walkdir::Error> for WalkError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let kind = if err.loop_ancestor().is_some() {
            WalkErrorKind::IoError
        } else {
            err.io_error()
                .map(WalkErrorKind::from_io)
                .unwrap_or(WalkErrorKind::IoError)
        };
        Self::new(kind, path, err.to_string())
    }
}

/// Failure reported by an [`Indexer`](crate::indexer::Indexer)
#[derive(Debug, Error)]
pub enum IndexError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// No URL could be derived for the image
    #[error("cannot build image url for {path:?}: {message}")]
    InvalidUrl { path: PathBuf, message: String },

    /// The indexing endpoint is not a usable URL
    #[error("invalid endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },

    /// The service answered with something unparseable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => IndexError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => IndexError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_io() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let other = std::io::Error::other("boom");
        assert_eq!(WalkErrorKind::from_io(&denied), WalkErrorKind::PermissionDenied);
        assert_eq!(WalkErrorKind::from_io(&missing), WalkErrorKind::NotFound);
        assert_eq!(WalkErrorKind::from_io(&other), WalkErrorKind::IoError);
    }

    #[test]
    fn test_from_io_keeps_path() {
        let err = WalkError::from_io(
            Path::new("/images/private"),
            &std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind, WalkErrorKind::PermissionDenied);
        assert_eq!(err.path, Some(PathBuf::from("/images/private")));
    }

    #[test]
    fn test_rejected_display() {
        let err = IndexError::Rejected {
            status: 500,
            body: "elastic unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "rejected with HTTP 500: elastic unavailable");
    }
}
