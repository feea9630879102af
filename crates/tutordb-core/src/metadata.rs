//! Newline-delimited JSON stream of chunk records, one per line in `id` order.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ChunkRecord;

/// Write `records` to `path`, creating the parent directory and replacing any
/// existing file.
pub fn write_metadata(path: &Path, records: &[ChunkRecord]) -> Result<()> {
    if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
    let mut out = BufWriter::new(fs::File::create(path)?);
    for r in records {
        serde_json::to_writer(&mut out, r)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Read the stream back, checking that every record sits at position `id`.
pub fn read_metadata(path: &Path) -> Result<Vec<ChunkRecord>> {
    parse_lines(path, BufReader::new(fs::File::open(path)?))
}

/// Same as [`read_metadata`] for a stream already in memory; `path` is only
/// used in error reports.
pub fn parse_metadata(path: &Path, bytes: &[u8]) -> Result<Vec<ChunkRecord>> {
    parse_lines(path, bytes)
}

fn parse_lines(path: &Path, reader: impl BufRead) -> Result<Vec<ChunkRecord>> {
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: ChunkRecord = serde_json::from_str(&line)
            .map_err(|e| Error::corrupt(path, format!("line {}: {}", lineno + 1, e)))?;
        if record.id != records.len() {
            return Err(Error::corrupt(path, format!("record id {} found at position {}", record.id, records.len())));
        }
        records.push(record);
    }
    Ok(records)
}
