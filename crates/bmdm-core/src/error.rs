//! Error taxonomy for archive operations.
//!
//! Extraction skips are deliberately absent: an input no extractor accepts
//! is reported as `Ok(None)` and never aborts a batch.

use std::path::{Path, PathBuf};

/// Errors returned by archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive not initialized at {}; run `bmdm boot` first", .root.display())]
    NotInitialized { root: PathBuf },

    #[error("malformed content in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(#[from] bmdm_config::ConfigError),
}

impl ArchiveError {
    /// Build a closure that wraps an [`std::io::Error`] with the path it
    /// occurred on, for use with `map_err`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Build a closure that wraps a [`serde_json::Error`] with the path of
    /// the document that failed to parse.
    pub(crate) fn parse(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Like [`parse`](Self::parse), for a document that failed to encode.
    pub(crate) fn serialize(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Serialize {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
