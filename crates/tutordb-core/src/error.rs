use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy shared by every tutordb crate.
///
/// `Configuration` and `CorruptIndex` are fatal for the affected corpus;
/// `Service` is transient and may be retried by the caller with backoff.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Embedding service failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Service { status: Option<u16>, message: String },

    #[error("No index found in {}: run a build first", .0.display())]
    CorpusNotBuilt(PathBuf),

    #[error("Corrupt index at {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unreadable document {}: {reason}", .path.display())]
    Document { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service { status: None, message: message.into() }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex { path: path.into(), reason: reason.into() }
    }

    /// Only transport/provider failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
