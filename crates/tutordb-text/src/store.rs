use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tutordb_core::{Error, Result};

use crate::ranking::Bm25Index;

/// Persisted form: the tokenized corpus only. Ranking state is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct TokenFile {
    tokens: Vec<Vec<String>>,
}

pub fn persist(index: &Bm25Index, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    #[derive(Serialize)]
    struct Borrowed<'a> {
        tokens: &'a [Vec<String>],
    }
    let json = serde_json::to_vec(&Borrowed { tokens: index.tokens() })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), docs = index.len(), "lexical index persisted");
    Ok(())
}

pub fn load(path: &Path) -> Result<Bm25Index> {
    decode(path, &fs::read(path)?)
}

/// Rebuild the ranking from token-file bytes already in memory.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<Bm25Index> {
    let file: TokenFile = serde_json::from_slice(bytes).map_err(|e| Error::corrupt(path, e.to_string()))?;
    Ok(Bm25Index::build(file.tokens))
}
