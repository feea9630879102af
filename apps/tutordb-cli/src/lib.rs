//! Shared setup for the tutordb binaries.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use tutordb_core::config::{Config, Settings};
use tutordb_core::progress::{ProgressFile, ProgressSink, ProgressState};
use tutordb_core::traits::Embedder;
use tutordb_embed::{get_default_embedder, FakeEmbedder, FAKE_EMBEDDING_DIM};
use tutordb_hybrid::{IndexManager, RetrieverCache};

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    Ok(config.settings()?)
}

/// Embedder for rebuilds, with the longer build timeout.
pub fn build_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(get_default_embedder(&settings.embedding, Duration::from_secs(settings.embedding.build_timeout_secs))?)
}

/// Embedder for interactive queries.
pub fn query_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(get_default_embedder(&settings.embedding, Duration::from_secs(settings.embedding.query_timeout_secs))?)
}

/// Manager whose rebuilds use `build` and whose cache answers searches with
/// `query`. Commands that never embed pass `None` and get the offline fake
/// for both, so they work without credentials.
pub fn index_manager(
    settings: &Arc<Settings>,
    embedders: Option<(Arc<dyn Embedder>, Arc<dyn Embedder>)>,
) -> Arc<IndexManager> {
    let (build, query) = embedders.unwrap_or_else(|| {
        let fake: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM));
        (Arc::clone(&fake), fake)
    });
    let cache = Arc::new(RetrieverCache::new(Arc::clone(settings), query));
    Arc::new(IndexManager::new(Arc::clone(settings), build, cache))
}

/// Mirrors rebuild progress onto a terminal bar and the owner's progress file.
pub struct BarProgress {
    bar: ProgressBar,
    file: ProgressFile,
}

impl BarProgress {
    pub fn new(file: ProgressFile) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar, file }
    }

    pub fn finish(&self, msg: &'static str) {
        self.bar.finish_with_message(msg);
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, state: ProgressState) {
        self.bar.set_position(u64::from(state.percent));
        self.bar.set_message(format!("{:?}", state.step).to_lowercase());
        self.file.report(state);
    }
}
