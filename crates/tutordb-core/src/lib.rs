//! Core types, configuration, chunking and corpus building for tutordb.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Everything here is synchronous and free of network access; the embedding
//! client, index stores and retrievers live in sibling crates.

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod progress;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
