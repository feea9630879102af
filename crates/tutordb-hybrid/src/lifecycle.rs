//! Index lifecycle: full per-owner rebuilds, run in the background with at
//! most one rebuild per owner in flight.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};
use tutordb_core::chunking::ChunkingConfig;
use tutordb_core::config::Settings;
use tutordb_core::corpus::{CorpusBuilder, PageExtractor, PdfExtractor};
use tutordb_core::layout::{CorpusPaths, LEXICAL_FILE, MANIFEST_FILE, META_FILE, VECTOR_FILE};
use tutordb_core::manifest::{write_manifest, Manifest};
use tutordb_core::metadata::write_metadata;
use tutordb_core::progress::{ProgressFile, ProgressSink, ProgressState, ProgressStep};
use tutordb_core::traits::Embedder;
use tutordb_core::types::Owner;
use tutordb_core::{Error, Result};
use tutordb_embed::embed_in_batches;
use tutordb_text::{tokenize, Bm25Index};
use tutordb_vector::FlatIpIndex;

use crate::cache::RetrieverCache;

const EMBED_START_PCT: usize = 20;
const EMBED_END_PCT: usize = 80;

/// Data files first, manifest last: readers trust only what it lists.
const PUBLISH_ORDER: [&str; 4] = [META_FILE, LEXICAL_FILE, VECTOR_FILE, MANIFEST_FILE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub documents: usize,
    pub chunks: usize,
    /// `None` for an empty corpus.
    pub dim: Option<usize>,
}

/// Regenerate one corpus from its documents.
///
/// Output goes to a staging directory and is published into
/// `paths.index_dir` only after every step succeeded. An empty document set
/// removes the index files instead; a missing document directory is an error
/// and leaves the index untouched.
pub fn rebuild_corpus(
    paths: &CorpusPaths,
    builder: &CorpusBuilder,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: &dyn ProgressSink,
) -> Result<RebuildSummary> {
    let staging = paths.staging_dir();
    let result = build_into(paths, &staging, builder, embedder, batch_size, progress);
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!(dir = %staging.display(), error = %e, "failed to clean staging dir");
        }
    }
    result
}

fn build_into(
    paths: &CorpusPaths,
    staging: &Path,
    builder: &CorpusBuilder,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: &dyn ProgressSink,
) -> Result<RebuildSummary> {
    if !paths.docs_dir.is_dir() {
        return Err(Error::NotFound(format!("document directory {}", paths.docs_dir.display())));
    }
    progress.report(ProgressState::new(ProgressStep::Chunking, 5));
    let documents = builder.list_documents(&paths.docs_dir)?.len();
    let records = builder.build_records(&paths.docs_dir)?;

    if records.is_empty() {
        for name in [MANIFEST_FILE, META_FILE, VECTOR_FILE, LEXICAL_FILE] {
            remove_if_exists(&paths.index_dir.join(name))?;
        }
        info!(dir = %paths.index_dir.display(), "no documents, index removed");
        progress.report(ProgressState::new(ProgressStep::Done, 100));
        return Ok(RebuildSummary { documents, chunks: 0, dim: None });
    }

    if staging.exists() {
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir_all(staging)?;
    write_metadata(&staging.join(META_FILE), &records)?;

    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let total = texts.len();
    let mut done = 0usize;
    progress.report(ProgressState::new(ProgressStep::Embedding, EMBED_START_PCT as u8));
    let vectors = embed_in_batches(&texts, batch_size, |batch| {
        let out = embedder.embed_batch(batch)?;
        done += batch.len();
        let pct = EMBED_START_PCT + (EMBED_END_PCT - EMBED_START_PCT) * done / total;
        debug!(done, total, "embedded batch");
        progress.report(ProgressState::new(ProgressStep::Embedding, pct as u8));
        Ok(out)
    })?;

    progress.report(ProgressState::new(ProgressStep::Indexing, 85));
    let dim = vectors.first().map(Vec::len).unwrap_or_default();
    let index = FlatIpIndex::build(&vectors, dim)?;
    tutordb_vector::persist(&index, &staging.join(VECTOR_FILE))?;

    progress.report(ProgressState::new(ProgressStep::Lexical, 95));
    let lexical = Bm25Index::build(records.iter().map(|r| tokenize(&r.text)).collect());
    tutordb_text::persist(&lexical, &staging.join(LEXICAL_FILE))?;

    let manifest = Manifest::describe(staging, &[META_FILE, VECTOR_FILE, LEXICAL_FILE])?;
    write_manifest(&staging.join(MANIFEST_FILE), &manifest)?;
    publish(staging, &paths.index_dir)?;
    info!(dir = %paths.index_dir.display(), generation = %manifest.generation, documents, chunks = total, dim, "index rebuilt");
    progress.report(ProgressState::new(ProgressStep::Done, 100));
    Ok(RebuildSummary { documents, chunks: total, dim: Some(dim) })
}

/// Move a staged build into `index_dir`, manifest last.
///
/// Live files are hard-linked into the staging dir first. If any rename
/// fails, the files already replaced are put back from those links (or
/// removed when there was nothing to restore), so the directory keeps the
/// previous generation.
fn publish(staging: &Path, index_dir: &Path) -> Result<()> {
    fs::create_dir_all(index_dir)?;
    let backup = |name: &str| staging.join(format!("{name}.prev"));
    for name in PUBLISH_ORDER {
        let live = index_dir.join(name);
        if live.is_file() {
            if let Err(e) = fs::hard_link(&live, backup(name)) {
                warn!(file = %live.display(), error = %e, "no backup of live index file");
            }
        }
    }
    for (done, name) in PUBLISH_ORDER.into_iter().enumerate() {
        if let Err(e) = fs::rename(staging.join(name), index_dir.join(name)) {
            warn!(file = name, error = %e, "publish failed, restoring previous index files");
            for &replaced in PUBLISH_ORDER[..done].iter().rev() {
                let live = index_dir.join(replaced);
                let saved = backup(replaced);
                let restored = if saved.is_file() { fs::rename(&saved, &live) } else { fs::remove_file(&live) };
                if let Err(e) = restored {
                    warn!(file = %live.display(), error = %e, "failed to restore index file");
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Forwards updates and remembers the last percentage for failure reports.
struct Tracking<'a> {
    inner: &'a dyn ProgressSink,
    last: AtomicU8,
}

impl ProgressSink for Tracking<'_> {
    fn report(&self, state: ProgressState) {
        self.last.store(state.percent, Ordering::Relaxed);
        self.inner.report(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Running,
    RunningPending,
}

/// What `schedule` did with a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// A new background rebuild was started.
    Started,
    /// A rebuild is already running; one more run was queued after it.
    Coalesced,
}

pub struct IndexManager {
    settings: Arc<Settings>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn PageExtractor>,
    cache: Arc<RetrieverCache>,
    slots: Mutex<HashMap<Owner, Slot>>,
}

impl IndexManager {
    /// `embedder` is used for rebuilds and should carry the build timeout.
    pub fn new(settings: Arc<Settings>, embedder: Arc<dyn Embedder>, cache: Arc<RetrieverCache>) -> Self {
        Self { settings, embedder, extractor: Arc::new(PdfExtractor), cache, slots: Mutex::new(HashMap::new()) }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<RetrieverCache> {
        &self.cache
    }

    pub fn paths(&self, owner: &Owner) -> CorpusPaths {
        CorpusPaths::for_owner(&self.settings, owner)
    }

    pub(crate) fn extractor(&self) -> &dyn PageExtractor {
        self.extractor.as_ref()
    }

    fn builder(&self) -> Result<CorpusBuilder> {
        let chunking = ChunkingConfig::new(self.settings.chunking.chunk_size, self.settings.chunking.overlap)?;
        Ok(CorpusBuilder::new(Arc::clone(&self.extractor), chunking))
    }

    /// Run one rebuild on the calling thread, recording progress in the
    /// owner's progress file. A failure leaves the previous index in place.
    pub fn rebuild(&self, owner: &Owner) -> Result<RebuildSummary> {
        let paths = self.paths(owner);
        let file = ProgressFile::new(paths.progress());
        let tracking = Tracking { inner: &file, last: AtomicU8::new(0) };
        let result = self
            .builder()
            .and_then(|builder| rebuild_corpus(&paths, &builder, self.embedder.as_ref(), self.settings.embedding.batch_size, &tracking));
        match &result {
            Ok(summary) => {
                self.cache.invalidate(owner);
                info!(%owner, chunks = summary.chunks, "rebuild finished");
            }
            Err(e) => {
                warn!(%owner, error = %e, "rebuild failed, keeping previous index");
                file.report(ProgressState::failed(e.to_string(), tracking.last.load(Ordering::Relaxed)));
            }
        }
        result
    }

    /// Request a background rebuild for `owner` and return immediately.
    ///
    /// While a rebuild runs, further requests collapse into a single follow-up
    /// run. Must be called from within a tokio runtime.
    pub fn schedule(self: &Arc<Self>, owner: Owner) -> Result<Scheduled> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Configuration("background rebuilds need a tokio runtime".into()))?;
        {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get_mut(&owner) {
                *slot = Slot::RunningPending;
                debug!(%owner, "rebuild already running, coalesced");
                return Ok(Scheduled::Coalesced);
            }
            slots.insert(owner.clone(), Slot::Running);
        }
        ProgressFile::new(self.paths(&owner).progress()).report(ProgressState::new(ProgressStep::Queued, 0));
        let this = Arc::clone(self);
        handle.spawn_blocking(move || this.run_slot(&owner));
        Ok(Scheduled::Started)
    }

    fn run_slot(&self, owner: &Owner) {
        loop {
            // Errors are already recorded in the progress file.
            let _ = self.rebuild(owner);
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match slots.get(owner) {
                Some(Slot::RunningPending) => {
                    slots.insert(owner.clone(), Slot::Running);
                }
                _ => {
                    slots.remove(owner);
                    return;
                }
            }
        }
    }

    pub fn is_rebuilding(&self, owner: &Owner) -> bool {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).contains_key(owner)
    }

    /// Resolves once no rebuild is running or queued for `owner`.
    pub async fn wait_idle(&self, owner: &Owner) {
        while self.is_rebuilding(owner) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Latest persisted progress for `owner`, if any rebuild ever reported.
    pub fn status(&self, owner: &Owner) -> Result<Option<ProgressState>> {
        ProgressFile::new(self.paths(owner).progress()).read()
    }
}
