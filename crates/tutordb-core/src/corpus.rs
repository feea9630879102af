//! Corpus builder: document directory → ordered chunk records.
//!
//! Documents are visited in file-name order, pages in page order, chunks in
//! window order, so the same directory always yields the same ids.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::chunking::{chunk_with, ChunkingConfig};
use crate::error::{Error, Result};
use crate::metadata::write_metadata;
use crate::types::ChunkRecord;

/// Turns one document into per-page text, page 1 first.
pub trait PageExtractor: Send + Sync {
    /// Lowercase file extension this extractor accepts (without the dot).
    fn extension(&self) -> &str;
    fn pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// PDF text extraction through `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extension(&self) -> &str { "pdf" }

    fn pages(&self, path: &Path) -> Result<Vec<String>> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::Document { path: path.to_path_buf(), reason: e.to_string() })?;
        let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(numbers.len());
        for n in numbers {
            let text = doc
                .extract_text(&[n])
                .map_err(|e| Error::Document { path: path.to_path_buf(), reason: format!("page {n}: {e}") })?;
            pages.push(text);
        }
        Ok(pages)
    }
}

pub struct CorpusBuilder {
    extractor: Arc<dyn PageExtractor>,
    chunking: ChunkingConfig,
}

impl CorpusBuilder {
    pub fn new(extractor: Arc<dyn PageExtractor>, chunking: ChunkingConfig) -> Self {
        Self { extractor, chunking }
    }

    pub fn pdf(chunking: ChunkingConfig) -> Self {
        Self::new(Arc::new(PdfExtractor), chunking)
    }

    pub fn extractor(&self) -> &dyn PageExtractor {
        self.extractor.as_ref()
    }

    /// Supported documents directly inside `dir`, sorted by file name.
    /// A missing directory is an empty document set.
    pub fn list_documents(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() { return Ok(Vec::new()); }
        let ext = self.extractor.extension();
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() { continue; }
            let matches = entry.path().extension().and_then(|s| s.to_str()).is_some_and(|s| s.eq_ignore_ascii_case(ext));
            if matches { files.push(entry.into_path()); }
        }
        Ok(files)
    }

    /// Extract and chunk every document. Any unreadable document fails the
    /// whole build before anything is written.
    pub fn build_records(&self, source_dir: &Path) -> Result<Vec<ChunkRecord>> {
        let files = self.list_documents(source_dir)?;
        let mut records: Vec<ChunkRecord> = Vec::new();
        for (file_index, path) in files.iter().enumerate() {
            let source = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            debug!(file = %source, "processing file {}/{}", file_index + 1, files.len());
            for (page_idx, page_text) in self.extractor.pages(path)?.iter().enumerate() {
                let page = u32::try_from(page_idx + 1).map_err(|_| Error::Document { path: path.clone(), reason: "too many pages".into() })?;
                let mut chunk_index = 0;
                for segment in chunk_with(page_text, &self.chunking) {
                    let text = segment.trim();
                    if text.is_empty() { continue; }
                    records.push(ChunkRecord { id: records.len(), source: source.clone(), page, chunk_index, text: text.to_string() });
                    chunk_index += 1;
                }
            }
        }
        info!(files = files.len(), chunks = records.len(), dir = %source_dir.display(), "corpus built");
        Ok(records)
    }

    /// Build and persist the metadata stream at `output_path`.
    pub fn build(&self, source_dir: &Path, output_path: &Path) -> Result<Vec<ChunkRecord>> {
        let records = self.build_records(source_dir)?;
        write_metadata(output_path, &records)?;
        Ok(records)
    }
}

/// PDF corpus build with explicit window geometry.
pub fn build_corpus(source_dir: &Path, chunk_size: usize, overlap: usize, output_path: &Path) -> Result<Vec<ChunkRecord>> {
    CorpusBuilder::pdf(ChunkingConfig::new(chunk_size, overlap)?).build(source_dir, output_path)
}
