//! Process-wide owner → retriever cache.
//!
//! Each entry is stamped with the manifest's modification time and size.
//! The manifest is the last file a rebuild publishes. A lookup whose stamp no
//! longer matches the file on disk reloads the corpus, so a finished rebuild
//! is picked up on the next search even without an explicit
//! [`RetrieverCache::invalidate`].

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use tutordb_core::config::Settings;
use tutordb_core::layout::CorpusPaths;
use tutordb_core::traits::{Embedder, SearchEngine};
use tutordb_core::types::{Hit, Owner};
use tutordb_core::{Error, Result};

use crate::composite::CompositeRetriever;
use crate::retriever::Retriever;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(paths: &CorpusPaths) -> Option<Self> {
        let meta = fs::metadata(paths.manifest()).ok()?;
        Some(Self { modified: meta.modified().ok(), len: meta.len() })
    }
}

pub struct RetrieverCache {
    settings: Arc<Settings>,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<HashMap<Owner, (Stamp, Arc<Retriever>)>>,
}

impl RetrieverCache {
    pub fn new(settings: Arc<Settings>, embedder: Arc<dyn Embedder>) -> Self {
        Self { settings, embedder, entries: RwLock::new(HashMap::new()) }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Embedder used for the query side of every loaded retriever.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Retriever for `owner`, loading it when absent or stale.
    ///
    /// Fails with `CorpusNotBuilt` when the owner has no persisted index.
    pub fn get(&self, owner: &Owner) -> Result<Arc<Retriever>> {
        let paths = CorpusPaths::for_owner(&self.settings, owner);
        let Some(stamp) = Stamp::of(&paths) else {
            self.invalidate(owner);
            return Err(Error::CorpusNotBuilt(paths.index_dir));
        };
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some((cached, retriever)) = entries.get(owner) {
                if *cached == stamp {
                    return Ok(Arc::clone(retriever));
                }
            }
        }
        let retriever = Arc::new(Retriever::load(&paths, Arc::clone(&self.embedder), self.settings.retrieval.top_k)?);
        info!(%owner, chunks = retriever.len(), lexical = retriever.has_lexical(), "retriever loaded");
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(owner.clone(), (stamp, Arc::clone(&retriever)));
        Ok(retriever)
    }

    pub fn invalidate(&self, owner: &Owner) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(owner).is_some() {
            debug!(%owner, "retriever evicted");
        }
    }

    pub fn cached_owners(&self) -> Vec<Owner> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut owners: Vec<Owner> = entries.keys().cloned().collect();
        owners.sort();
        owners
    }

    /// Global corpus plus, when given, that user's private corpus. Owners
    /// without an index are left out; load failures are logged and skipped.
    pub fn composite_for(&self, user: Option<u64>) -> CompositeRetriever {
        let mut composite = CompositeRetriever::new(self.settings.retrieval.top_k);
        let owners = std::iter::once(Owner::Global).chain(user.map(Owner::User));
        for owner in owners {
            match self.get(&owner) {
                Ok(retriever) => composite.push(owner.to_string(), retriever),
                Err(Error::CorpusNotBuilt(_)) => debug!(%owner, "no index, skipping"),
                Err(e) => warn!(%owner, error = %e, "failed to load retriever, skipping"),
            }
        }
        composite
    }

    pub fn search(&self, user: Option<u64>, query: &str) -> Result<Vec<Hit>> {
        self.composite_for(user).search(query)
    }
}
