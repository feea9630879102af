//! Hybrid retrieval over per-owner corpora and the machinery that keeps
//! their indexes current.

pub mod cache;
pub mod composite;
pub mod documents;
pub mod lifecycle;
pub mod retriever;

pub use cache::RetrieverCache;
pub use composite::{merge_hits, CompositeRetriever};
pub use documents::validate_filename;
pub use lifecycle::{rebuild_corpus, IndexManager, RebuildSummary, Scheduled};
pub use retriever::Retriever;
