//! Error types for the restructuring pipeline.
//!
//! Most structural problems (a heading that does not match, a provenance title that cannot be
//! resolved) are not errors at all: they fall back to a catch-all or a null record. What remains
//! here is what a caller has to see: unreadable artifacts, a failing generation service, and
//! configuration that cannot be honoured.

use std::path::PathBuf;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// An artifact could not be parsed or serialised as JSON.
    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        /// Artifact path.
        path: PathBuf,
        /// Underlying serde failure.
        source: serde_json::Error,
    },

    /// A heading pattern could not be compiled.
    #[error("invalid heading pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Transport failure talking to the generation service.
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The generation service answered, but not with usable text.
    #[error("generation service error: {0}")]
    Generation(String),

    /// The input folder does not exist.
    #[error("input folder not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Settings that cannot be used as given.
    #[error("configuration error: {0}")]
    Config(String),

    /// A stage ran and failed; its status record has been marked failed.
    #[error("stage '{stage}' failed: {reason}")]
    StageFailed {
        /// Stage name as recorded in the status file.
        stage: String,
        /// Display form of the underlying error.
        reason: String,
    },
}

impl Error {
    #[must_use]
    /// Attach a path to an I/O failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    /// Attach a path to a JSON failure.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
