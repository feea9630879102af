//! Fixed-window character chunking with overlap.

use crate::error::{Error, Result};

/// Window geometry, validated on construction so `step()` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidInput("chunk size must be positive".into()));
        }
        if overlap >= size {
            return Err(Error::InvalidInput(format!("chunk overlap ({overlap}) must be smaller than chunk size ({size})")));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize { self.size }
    pub fn overlap(&self) -> usize { self.overlap }
    pub fn step(&self) -> usize { self.size - self.overlap }
}

/// Split `text` into overlapping segments of `size` characters.
///
/// Segment `i` starts at character `i * (size - overlap)`; the last segment
/// may be shorter and always ends at the end of the text. NUL characters are
/// removed first, and whitespace-only input yields no segments. Segments are
/// returned untrimmed.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    let cfg = ChunkingConfig::new(size, overlap)?;
    Ok(chunk_with(text, &cfg))
}

pub fn chunk_with(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|&c| c != '\0').collect();
    if chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }
    let n = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + cfg.size).min(n);
        chunks.push(chars[start..end].iter().collect());
        if end == n {
            break;
        }
        start += cfg.step();
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_windows() {
        let chunks = chunk_text("ABCDEFGHIJ", 4, 1).expect("chunk");
        assert_eq!(chunks, vec!["ABCD", "DEFG", "GHIJ"]);
    }

    #[test]
    fn short_text_is_one_segment() {
        assert_eq!(chunk_text("abc", 10, 2).expect("chunk"), vec!["abc"]);
        assert_eq!(chunk_text("abcd", 4, 1).expect("chunk"), vec!["abcd"]);
    }

    #[test]
    fn blank_and_nul_only_text_yields_nothing() {
        assert!(chunk_text("", 4, 1).expect("chunk").is_empty());
        assert!(chunk_text(" \n\t ", 4, 1).expect("chunk").is_empty());
        assert!(chunk_text("\0\0 \0", 4, 1).expect("chunk").is_empty());
    }

    #[test]
    fn nul_characters_are_stripped_before_windowing() {
        assert_eq!(chunk_text("AB\0CD\0EF", 4, 0).expect("chunk"), vec!["ABCD", "EF"]);
    }

    #[test]
    fn segment_count_matches_closed_form() {
        let text: String = std::iter::repeat('x').take(1000).collect();
        for (size, overlap) in [(700, 120), (100, 0), (64, 63), (7, 3), (1000, 10), (999, 1)] {
            let got = chunk_text(&text, size, overlap).expect("chunk").len();
            let l = text.chars().count();
            let want = if l > size { (l - overlap).div_ceil(size - overlap) } else { 1 };
            assert_eq!(got, want, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn deterministic_and_multibyte_safe() {
        let text = "操作系统中的死锁是指两个或多个进程在执行过程中因争夺资源而造成的一种互相等待的现象";
        let a = chunk_text(text, 10, 3).expect("chunk");
        let b = chunk_text(text, 10, 3).expect("chunk");
        assert_eq!(a, b);
        assert!(a.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(a[0].chars().skip(7).collect::<String>(), a[1].chars().take(3).collect::<String>());
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(matches!(chunk_text("abc", 4, 4), Err(Error::InvalidInput(_))));
        assert!(matches!(chunk_text("abc", 4, 9), Err(Error::InvalidInput(_))));
        assert!(matches!(chunk_text("abc", 0, 0), Err(Error::InvalidInput(_))));
    }
}
