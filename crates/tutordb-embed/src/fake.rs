use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use tutordb_core::traits::Embedder;
use tutordb_core::Result;

/// Deterministic, offline embedder: each character is hashed into a bucket
/// and the resulting bag is L2-normalized. Texts sharing characters get a
/// positive inner product, which is enough to exercise retrieval end to end.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn dim(&self) -> usize { self.dim }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            let mut hasher = XxHash64::with_seed(0);
            c.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 1.0 + (((h >> 32) as u32) as f32 / u32::MAX as f32) * 0.1;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
