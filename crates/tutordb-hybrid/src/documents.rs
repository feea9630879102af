//! Document management for per-user corpora. Every change schedules a
//! rebuild of the affected owner.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use tutordb_core::types::{DocumentInfo, DocumentScope, Owner};
use tutordb_core::{Error, Result};

use crate::lifecycle::{IndexManager, Scheduled};

impl IndexManager {
    /// Store an uploaded document in the user's directory and schedule a
    /// rebuild. An existing file with the same name is replaced.
    pub fn add_document(self: &Arc<Self>, user: u64, filename: &str, bytes: &[u8]) -> Result<Scheduled> {
        let path = self.user_document_path(user, filename)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, bytes)?;
        info!(user, file = filename, bytes = bytes.len(), "document stored");
        self.schedule(Owner::User(user))
    }

    /// Delete one of the user's documents and schedule a rebuild. Global
    /// documents cannot be removed this way.
    pub fn remove_document(self: &Arc<Self>, user: u64, filename: &str) -> Result<Scheduled> {
        let path = self.user_document_path(user, filename)?;
        if !path.is_file() {
            return Err(Error::NotFound(format!("document '{filename}' for user {user}")));
        }
        fs::remove_file(&path)?;
        info!(user, file = filename, "document removed");
        self.schedule(Owner::User(user))
    }

    /// Global documents first, then the user's own, each sorted by name.
    pub fn list_documents(&self, user: Option<u64>) -> Result<Vec<DocumentInfo>> {
        let mut out = self.documents_in(&self.paths(&Owner::Global).docs_dir, DocumentScope::Global)?;
        if let Some(id) = user {
            out.extend(self.documents_in(&self.paths(&Owner::User(id)).docs_dir, DocumentScope::User)?);
        }
        Ok(out)
    }

    fn documents_in(&self, dir: &Path, scope: DocumentScope) -> Result<Vec<DocumentInfo>> {
        let ext = self.extractor().extension();
        let mut docs = Vec::new();
        if !dir.is_dir() {
            return Ok(docs);
        }
        let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let meta = entry.metadata()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !meta.is_file() || !has_extension(&name, ext) {
                continue;
            }
            let modified: DateTime<Utc> = meta.modified()?.into();
            docs.push(DocumentInfo { name, modified: modified.to_rfc3339(), scope });
        }
        Ok(docs)
    }

    fn user_document_path(&self, user: u64, filename: &str) -> Result<PathBuf> {
        validate_filename(filename, self.extractor().extension())?;
        Ok(self.paths(&Owner::User(user)).docs_dir.join(filename))
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name).extension().and_then(|s| s.to_str()).is_some_and(|s| s.eq_ignore_ascii_case(ext))
}

/// A bare file name (no directories) with the accepted extension.
pub fn validate_filename(name: &str, ext: &str) -> Result<()> {
    let bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if name.trim().is_empty() || !bare || name.contains(['/', '\\', '\0']) || name.starts_with('.') {
        return Err(Error::InvalidInput(format!("invalid document name '{name}'")));
    }
    if !has_extension(name, ext) {
        return Err(Error::InvalidInput(format!("only .{ext} documents are supported: '{name}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_pdf_names_in_any_case() {
        assert!(validate_filename("操作系统.pdf", "pdf").is_ok());
        assert!(validate_filename("Lecture 03.PDF", "pdf").is_ok());
    }

    #[test]
    fn rejects_paths_and_other_types() {
        for bad in ["../x.pdf", "a/b.pdf", "a\\b.pdf", "", ".pdf", "notes.txt", "pdf"] {
            assert!(matches!(validate_filename(bad, "pdf"), Err(Error::InvalidInput(_))), "{bad}");
        }
    }
}
