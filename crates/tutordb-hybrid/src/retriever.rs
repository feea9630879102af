use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tutordb_core::layout::{CorpusPaths, LEXICAL_FILE, META_FILE, VECTOR_FILE};
use tutordb_core::manifest::read_manifest;
use tutordb_core::metadata::parse_metadata;
use tutordb_core::traits::{Embedder, SearchEngine};
use tutordb_core::types::{ChunkRecord, Hit, SourceKind};
use tutordb_core::{Error, Result};
use tutordb_text::{tokenize, Bm25Index};
use tutordb_vector::FlatIpIndex;

/// Characters of chunk text used in the near-duplicate key.
const DEDUP_PREFIX_CHARS: usize = 50;

/// Hybrid search over one persisted corpus.
///
/// Vector hits come first in vector-score order; lexical hits that are not
/// near-duplicates of an accepted hit are appended after them in lexical-score
/// order. Scores of the two kinds are never compared.
pub struct Retriever {
    records: Vec<ChunkRecord>,
    vectors: FlatIpIndex,
    lexical: Option<Bm25Index>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Load a built corpus. Metadata, vector rows and lexical documents must
    /// line up one-to-one and all belong to the generation named by the
    /// manifest; the lexical index is optional.
    pub fn load(paths: &CorpusPaths, embedder: Arc<dyn Embedder>, top_k: usize) -> Result<Self> {
        if !paths.is_built() {
            return Err(Error::CorpusNotBuilt(paths.index_dir.clone()));
        }
        let manifest = read_manifest(&paths.manifest())?;
        let dir = &paths.index_dir;
        let records = parse_metadata(&paths.meta(), &manifest.read_verified(dir, META_FILE)?)?;
        let vectors = tutordb_vector::decode(&paths.vectors(), &manifest.read_verified(dir, VECTOR_FILE)?)?;
        if vectors.len() != records.len() {
            return Err(Error::corrupt(
                paths.vectors(),
                format!("{} vector rows but {} metadata records", vectors.len(), records.len()),
            ));
        }
        let lexical = if manifest.contains(LEXICAL_FILE) {
            let index = tutordb_text::decode(&paths.lexical(), &manifest.read_verified(dir, LEXICAL_FILE)?)?;
            if index.len() != records.len() {
                return Err(Error::corrupt(
                    paths.lexical(),
                    format!("{} lexical documents but {} metadata records", index.len(), records.len()),
                ));
            }
            Some(index)
        } else {
            debug!(dir = %dir.display(), "no lexical index, vector-only search");
            None
        };
        debug!(dir = %dir.display(), generation = %manifest.generation, "corpus loaded");
        Ok(Self { records, vectors, lexical, embedder, top_k })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_lexical(&self) -> bool {
        self.lexical.is_some()
    }

    fn record(&self, row: usize) -> Result<&ChunkRecord> {
        self.records
            .get(row)
            .ok_or_else(|| Error::corrupt("", format!("row {row} has no metadata record")))
    }
}

fn dedup_key(hit: &Hit) -> (String, u32, String) {
    (hit.source.clone(), hit.page, hit.text.chars().take(DEDUP_PREFIX_CHARS).collect())
}

impl SearchEngine for Retriever {
    fn search(&self, query: &str) -> Result<Vec<Hit>> {
        let qv = self.embedder.embed(query)?;
        let mut hits = Vec::with_capacity(self.top_k * 2);
        for (score, row) in self.vectors.query(&qv, self.top_k)? {
            hits.push(Hit::from_record(self.record(row)?, score, SourceKind::Vector));
        }
        let Some(lexical) = &self.lexical else {
            return Ok(hits);
        };
        let mut seen: HashSet<(String, u32, String)> = hits.iter().map(dedup_key).collect();
        for (score, row) in lexical.top_k(&tokenize(query), self.top_k) {
            let hit = Hit::from_record(self.record(row)?, score, SourceKind::Lexical);
            if seen.insert(dedup_key(&hit)) {
                hits.push(hit);
            }
        }
        Ok(hits)
    }
}
