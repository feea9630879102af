//! Embedding backends: the remote provider client and an offline fake.
//!
//! `APP_USE_FAKE_EMBEDDINGS=1` swaps in the [`FakeEmbedder`] so indexing and
//! search run without credentials or network access.

mod client;
mod fake;

pub use client::{embed_in_batches, ApiEmbedder};
pub use fake::FakeEmbedder;

use std::sync::Arc;
use std::time::Duration;

use tutordb_core::config::EmbeddingSettings;
use tutordb_core::traits::Embedder;
use tutordb_core::Result;

pub const FAKE_EMBEDDING_DIM: usize = 256;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Provider client from settings, or the fake when requested via env.
pub fn get_default_embedder(settings: &EmbeddingSettings, timeout: Duration) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    Ok(Arc::new(ApiEmbedder::from_settings(settings, timeout)?))
}
