//! Domain types shared by the indexing and retrieval crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, zero-based position of a chunk inside one corpus.
///
/// Metadata line `n`, vector row `n` and lexical document `n` all describe
/// the chunk with `id == n`.
pub type ChunkId = usize;

/// One unit of indexed text.
///
/// - `id`: ordinal position in the persisted metadata stream
/// - `source`: file name of the originating document
/// - `page`: 1-based page number within `source`
/// - `chunk_index`: 0-based position of this chunk within its page
/// - `text`: trimmed, never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
    pub text: String,
}

/// Indicates which scoring primitive produced a hit.
///
/// Scores of different kinds live on different scales and are never
/// compared against each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vector,
    Lexical,
}

/// A scored search result, built fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub score: f32,
    pub kind: SourceKind,
    pub source: String,
    pub page: u32,
    pub text: String,
}

impl Hit {
    pub fn from_record(record: &ChunkRecord, score: f32, kind: SourceKind) -> Self {
        Self { score, kind, source: record.source.clone(), page: record.page, text: record.text.clone() }
    }
}

/// Who a corpus belongs to: the shared collection or one user's uploads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Global,
    User(u64),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Global => write!(f, "global"),
            Owner::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Where a listed document lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentScope {
    Global,
    User,
}

/// One entry of a document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    /// RFC 3339 modification time.
    pub modified: String,
    pub scope: DocumentScope,
}
