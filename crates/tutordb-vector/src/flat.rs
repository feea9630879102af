use tutordb_core::{Error, Result};

/// Exact inner-product index. Row `i` is the embedding of chunk `id = i`.
///
/// Scores are raw dot products; vectors are not normalized here.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn build(vectors: &[Vec<f32>], dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidInput("vector dimension must be positive".into()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (row, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::InvalidInput(format!("row {row} has dimension {}, expected {dim}", v.len())));
            }
            data.extend_from_slice(v);
        }
        Ok(Self { dim, data })
    }

    /// Rebuild from a flat row-major buffer, as read back from disk.
    pub(crate) fn from_raw(dim: usize, data: Vec<f32>) -> Self {
        Self { dim, data }
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, id: usize) -> Option<&[f32]> {
        self.data.get(id * self.dim..(id + 1) * self.dim)
    }

    /// Up to `k` `(score, row)` pairs, highest score first. Ties keep row order;
    /// rows scoring NaN are left out.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(f32, usize)>> {
        if vector.len() != self.dim {
            return Err(Error::CorruptIndex {
                path: Default::default(),
                reason: format!("query dimension {} does not match index dimension {}", vector.len(), self.dim),
            });
        }
        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| (dot(v, vector), row))
            .filter(|(score, _)| !score.is_nan())
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
