use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;
use tutordb_core::traits::SearchEngine;
use tutordb_core::types::{Hit, SourceKind};
use tutordb_core::Result;

/// Fans one query out to several corpora and merges the answers.
///
/// Member failures are logged and skipped. Merge order: every vector hit by
/// score, then every lexical hit by score; duplicates by trimmed text are
/// dropped (first wins) before truncating to `top_k`.
pub struct CompositeRetriever {
    members: Vec<(String, Arc<dyn SearchEngine>)>,
    top_k: usize,
}

impl CompositeRetriever {
    pub fn new(top_k: usize) -> Self {
        Self { members: Vec::new(), top_k }
    }

    pub fn with_member(mut self, name: impl Into<String>, member: Arc<dyn SearchEngine>) -> Self {
        self.push(name, member);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, member: Arc<dyn SearchEngine>) {
        self.members.push((name.into(), member));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn kind_rank(kind: SourceKind) -> u8 {
    match kind {
        SourceKind::Vector => 0,
        SourceKind::Lexical => 1,
    }
}

/// Order, deduplicate and cap hits gathered from several members. Hits with
/// a NaN score are dropped.
pub fn merge_hits(mut hits: Vec<Hit>, top_k: usize) -> Vec<Hit> {
    hits.retain(|h| !h.score.is_nan());
    hits.sort_by(|a, b| kind_rank(a.kind).cmp(&kind_rank(b.kind)).then_with(|| b.score.total_cmp(&a.score)));
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(top_k.min(hits.len()));
    for hit in hits {
        if out.len() == top_k {
            break;
        }
        let key = hit.text.trim();
        if key.is_empty() || !seen.insert(key.to_string()) {
            continue;
        }
        out.push(hit);
    }
    out
}

impl SearchEngine for CompositeRetriever {
    fn search(&self, query: &str) -> Result<Vec<Hit>> {
        let mut all = Vec::new();
        for (name, member) in &self.members {
            match member.search(query) {
                Ok(hits) => all.extend(hits),
                Err(e) => warn!(member = %name, error = %e, "corpus search failed, skipping"),
            }
        }
        Ok(merge_hits(all, self.top_k))
    }
}
