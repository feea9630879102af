//! Remote embedding client for an OpenAI-compatible `/embeddings` endpoint.
//!
//! Inputs are sent in fixed-size batches; each response is re-sorted by the
//! provider's position field so output order always matches input order.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use tutordb_core::config::EmbeddingSettings;
use tutordb_core::traits::Embedder;
use tutordb_core::{Error, Result};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    #[serde(alias = "embeddings")]
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(alias = "vector")]
    embedding: Vec<f32>,
    #[serde(alias = "position", alias = "text_index")]
    index: usize,
}

/// Reorder one batch response by declared position and check it covers
/// exactly `expected` inputs.
pub(crate) fn order_by_position(resp: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut items = resp.data;
    if items.len() != expected {
        return Err(Error::service(format!("expected {} embeddings, got {}", expected, items.len())));
    }
    items.sort_by_key(|item| item.index);
    if items.iter().enumerate().any(|(i, item)| item.index != i) {
        return Err(Error::service("embedding positions are not a permutation of the inputs"));
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

/// Run `embed_one` over consecutive slices of `batch_size` texts and
/// concatenate the results in order.
pub fn embed_in_batches<F>(texts: &[String], batch_size: usize, mut embed_one: F) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f32>>>,
{
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = embed_one(batch)?;
        if vectors.len() != batch.len() {
            return Err(Error::service(format!("expected {} embeddings, got {}", batch.len(), vectors.len())));
        }
        out.extend(vectors);
    }
    Ok(out)
}

pub struct ApiEmbedder {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    batch_size: usize,
}

impl ApiEmbedder {
    pub fn new(base_url: &str, api_key: String, model: String, batch_size: usize, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("embedding API key is empty".into()));
        }
        if model.trim().is_empty() {
            return Err(Error::Configuration("embedding model is not set".into()));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self { http, endpoint, api_key, model, batch_size: batch_size.max(1) })
    }

    pub fn from_settings(settings: &EmbeddingSettings, timeout: Duration) -> Result<Self> {
        let key = settings.resolve_api_key()?;
        Self::new(&settings.base_url, key, settings.model.clone(), settings.batch_size, timeout)
    }

    pub fn model(&self) -> &str { &self.model }

    fn request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(texts = batch.len(), model = %self.model, "embedding request");
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: batch })
            .send()
            .map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Service { status: Some(status.as_u16()), message: truncate(&body, 300) });
        }
        let parsed: EmbeddingResponse = resp.json().map_err(transport_error)?;
        order_by_position(parsed, batch.len())
    }
}

impl Embedder for ApiEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, |batch| self.request(batch))
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Service { status: e.status().map(|s| s.as_u16()), message: e.to_string() }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
