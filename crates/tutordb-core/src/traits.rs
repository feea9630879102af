use crate::error::{Error, Result};
use crate::types::Hit;

/// Maps texts to dense vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Single-text form: a batch of one.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::service("embedding response contained no vectors"))
    }
}

/// Anything that answers a query with ranked hits: one corpus or several.
pub trait SearchEngine: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<Hit>>;
}
