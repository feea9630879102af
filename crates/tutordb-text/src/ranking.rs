use std::collections::HashMap;
use std::fmt;

use bm25::{Document, SearchEngine, SearchEngineBuilder, Tokenizer};

use crate::tokenize::tokenize;

/// Feeds the `bm25` engine the same per-character tokens that are persisted
/// in the token file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        tokenize(input_text)
    }
}

/// BM25 ranking over a tokenized corpus; document `i` is chunk `id = i`.
///
/// Scoring is delegated to the `bm25` crate. Each document is handed over as
/// its concatenated tokens, which [`CharTokenizer`] splits back into the
/// identical sequence, so the same tokens always produce the same scores.
pub struct Bm25Index {
    tokens: Vec<Vec<String>>,
    engine: SearchEngine<usize, u32, CharTokenizer>,
}

impl fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bm25Index").field("documents", &self.tokens.len()).finish_non_exhaustive()
    }
}

impl Bm25Index {
    pub fn build(tokens: Vec<Vec<String>>) -> Self {
        let documents: Vec<Document<usize>> = tokens
            .iter()
            .enumerate()
            .map(|(id, doc)| Document { id, contents: doc.concat() })
            .collect();
        let engine =
            SearchEngineBuilder::<usize, u32, CharTokenizer>::with_tokenizer_and_documents(CharTokenizer, documents)
                .build();
        Self { tokens, engine }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Vec<String>] {
        &self.tokens
    }

    fn matches(&self, query: &[String]) -> Vec<(f32, usize)> {
        if query.is_empty() || self.tokens.is_empty() {
            return Vec::new();
        }
        self.engine
            .search(&query.concat(), self.tokens.len())
            .into_iter()
            .map(|r| (r.score, r.document.id))
            .collect()
    }

    /// One score per document, in document order; zero where nothing matched.
    pub fn score(&self, query: &[String]) -> Vec<f32> {
        let found: HashMap<usize, f32> = self.matches(query).into_iter().map(|(s, row)| (row, s)).collect();
        (0..self.tokens.len()).map(|row| found.get(&row).copied().unwrap_or(0.0)).collect()
    }

    /// Best `k` documents with a positive score, as `(score, row)`, highest
    /// first; ties keep document order.
    pub fn top_k(&self, query: &[String], k: usize) -> Vec<(f32, usize)> {
        let mut scored: Vec<(f32, usize)> = self.matches(query).into_iter().filter(|(s, _)| *s > 0.0).collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(docs: &[&str]) -> Bm25Index {
        Bm25Index::build(docs.iter().map(|d| tokenize(d)).collect())
    }

    #[test]
    fn matching_document_ranks_first() {
        let idx = index(&["死锁的必要条件", "页面置换算法", "进程调度算法", "文件系统"]);
        let top = idx.top_k(&tokenize("死锁"), 4);
        assert_eq!(top[0].1, 0);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn char_tokenizer_matches_persisted_tokens() {
        let text = "死锁 LRU\n算法";
        assert_eq!(CharTokenizer.tokenize(text), tokenize(text));
        assert_eq!(CharTokenizer.tokenize(&tokenize(text).concat()), tokenize(text));
    }

    #[test]
    fn only_matching_documents_score() {
        let idx = index(&["置", "甲", "乙", "丙"]);
        let scores = idx.score(&tokenize("置"));
        assert!(scores[0] > 0.0);
        assert_eq!(&scores[1..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn terms_in_every_document_still_rank() {
        let idx = index(&["算法", "法律", "方法", "法"]);
        let top = idx.top_k(&tokenize("法"), 4);
        assert_eq!(top.len(), 4);
        assert!(top.iter().all(|(s, _)| *s > 0.0));
    }

    #[test]
    fn rarer_terms_outweigh_common_ones() {
        // "锁" is in one document, "法" in three.
        let idx = index(&["锁法", "算法", "方法", "其他"]);
        let s = idx.score(&tokenize("锁"));
        let common = idx.score(&tokenize("法"));
        assert!(s[0] > common[0]);
    }

    #[test]
    fn shorter_documents_score_higher_for_the_same_tf() {
        let idx = index(&["锁", "锁甲乙丙丁戊", "其他", "无关"]);
        let s = idx.score(&tokenize("锁"));
        assert!(s[0] > s[1]);
    }

    #[test]
    fn equal_scores_keep_document_order() {
        let idx = index(&["无关", "锁", "锁", "其他"]);
        let rows: Vec<usize> = idx.top_k(&tokenize("锁"), 4).into_iter().map(|(_, r)| r).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn empty_corpus_scores_nothing() {
        let idx = Bm25Index::build(Vec::new());
        assert!(idx.is_empty());
        assert!(idx.score(&tokenize("死锁")).is_empty());
        assert!(idx.top_k(&tokenize("死锁"), 3).is_empty());
    }

    #[test]
    fn blank_query_matches_nothing() {
        let idx = index(&["死锁", "页面"]);
        assert_eq!(idx.score(&tokenize("  ")), vec![0.0, 0.0]);
        assert!(idx.top_k(&tokenize("\n"), 2).is_empty());
    }
}
