//! tutordb-text
//!
//! Lexical side of retrieval: per-character tokenization, BM25 ranking through the `bm25` crate
//! and the `bm25.json` token file the ranking is rebuilt from on load.

pub mod ranking;
pub mod store;
pub mod tokenize;

pub use ranking::{Bm25Index, CharTokenizer};
pub use store::{decode, load, persist};
pub use tokenize::tokenize;
