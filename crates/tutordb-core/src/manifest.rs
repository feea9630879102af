//! `manifest.json`: the set of index files that make up one published build.
//!
//! A rebuild moves `meta.jsonl`, `bm25.json` and `vectors.bin` into place
//! one by one and writes the manifest last. Readers only accept file bytes
//! whose length and xxh64 digest match the manifest, so a directory holding
//! files from two different builds is reported as corrupt instead of being
//! searched with scores pointing at the wrong text.

use std::collections::BTreeMap;
use std::fs;
use std::hash::Hasher;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub len: u64,
    pub xxh64: u64,
}

impl FileDigest {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(bytes);
        Self { len: bytes.len() as u64, xxh64: hasher.finish() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: String,
    pub built_at: DateTime<Utc>,
    pub files: BTreeMap<String, FileDigest>,
}

impl Manifest {
    /// Digest the `names` files of `dir` under a fresh generation id.
    pub fn describe(dir: &Path, names: &[&str]) -> Result<Self> {
        let built_at = Utc::now();
        let generation = built_at.format("%Y%m%dT%H%M%S%.9fZ").to_string();
        let mut files = BTreeMap::new();
        for name in names {
            files.insert((*name).to_string(), FileDigest::of(&fs::read(dir.join(name))?));
        }
        Ok(Self { generation, built_at, files })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Read `dir/name` and return its bytes only if they are the ones this
    /// manifest was written for.
    pub fn read_verified(&self, dir: &Path, name: &str) -> Result<Vec<u8>> {
        let path = dir.join(name);
        let want = self
            .files
            .get(name)
            .ok_or_else(|| Error::corrupt(&path, format!("not part of index generation {}", self.generation)))?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::corrupt(&path, format!("missing from index generation {}", self.generation)));
            }
            Err(e) => return Err(e.into()),
        };
        if FileDigest::of(&bytes) != *want {
            return Err(Error::corrupt(&path, format!("does not belong to index generation {}", self.generation)));
        }
        Ok(bytes)
    }
}

/// Write the manifest to a temporary file and rename it over `path`.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(manifest)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))
}
