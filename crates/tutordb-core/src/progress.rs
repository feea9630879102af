//! Rebuild progress, persisted as a small JSON object per owner.
//!
//! The file is replaced atomically (write to a sibling, then rename) so a
//! concurrent status query always reads a complete, latest-known state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    Queued,
    Chunking,
    Embedding,
    Indexing,
    Lexical,
    Done,
    Failed,
}

impl ProgressStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub step: ProgressStep,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ProgressState {
    pub fn new(step: ProgressStep, percent: u8) -> Self {
        Self { step, percent: percent.min(100), error: None, updated_at: Some(Utc::now().to_rfc3339()) }
    }

    pub fn failed(reason: impl Into<String>, percent: u8) -> Self {
        Self { error: Some(reason.into()), ..Self::new(ProgressStep::Failed, percent) }
    }
}

/// Receives progress updates from a rebuild.
pub trait ProgressSink: Send + Sync {
    fn report(&self, state: ProgressState);
}

/// Discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _state: ProgressState) {}
}

/// Persists each update to one JSON file, overwriting it in place.
#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
}

impl ProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    pub fn write(&self, state: &ProgressState) -> Result<()> {
        if let Some(dir) = self.path.parent() { fs::create_dir_all(dir)?; }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// `None` when no rebuild has ever reported for this owner.
    pub fn read(&self) -> Result<Option<ProgressState>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ProgressSink for ProgressFile {
    fn report(&self, state: ProgressState) {
        if let Err(e) = self.write(&state) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist progress");
        }
    }
}
