//! On-disk layout of one corpus and the owner → directory mapping.

use std::path::PathBuf;

use crate::config::Settings;
use crate::types::Owner;

pub const META_FILE: &str = "meta.jsonl";
pub const VECTOR_FILE: &str = "vectors.bin";
pub const LEXICAL_FILE: &str = "bm25.json";
pub const PROGRESS_FILE: &str = "progress.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Document and index directories of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusPaths {
    pub docs_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl CorpusPaths {
    pub fn new(docs_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self { docs_dir: docs_dir.into(), index_dir: index_dir.into() }
    }

    /// Global corpus uses the configured directories; each user gets
    /// `<data_dir>/<id>/pdfs` and `<data_dir>/<id>/index`.
    pub fn for_owner(settings: &Settings, owner: &Owner) -> Self {
        match owner {
            Owner::Global => Self::new(settings.pdf_dir(), settings.index_dir()),
            Owner::User(id) => {
                let root = settings.data_dir().join(id.to_string());
                Self::new(root.join("pdfs"), root.join("index"))
            }
        }
    }

    pub fn meta(&self) -> PathBuf { self.index_dir.join(META_FILE) }
    pub fn vectors(&self) -> PathBuf { self.index_dir.join(VECTOR_FILE) }
    pub fn lexical(&self) -> PathBuf { self.index_dir.join(LEXICAL_FILE) }
    pub fn progress(&self) -> PathBuf { self.index_dir.join(PROGRESS_FILE) }
    pub fn manifest(&self) -> PathBuf { self.index_dir.join(MANIFEST_FILE) }

    /// Sibling directory that a rebuild writes into before swapping files in.
    pub fn staging_dir(&self) -> PathBuf {
        let name = self.index_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "index".into());
        self.index_dir.with_file_name(format!(".{name}.staging"))
    }

    /// A corpus is searchable once a build has been published: its manifest,
    /// vector and metadata files all exist.
    pub fn is_built(&self) -> bool {
        self.manifest().is_file() && self.vectors().is_file() && self.meta().is_file()
    }
}
