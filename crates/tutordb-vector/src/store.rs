//! `vectors.bin` layout:
//!
//! ```text
//! magic  b"TDBVEC01"
//! dim    u32 little-endian
//! rows   u64 little-endian
//! data   rows * dim f32, row-major
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;
use tutordb_core::{Error, Result};

use crate::flat::FlatIpIndex;

const MAGIC: &[u8; 8] = b"TDBVEC01";
const HEADER_LEN: usize = 8 + 4 + 8;

/// Write the index to `path`, replacing any previous file only once the new
/// one is complete.
pub fn persist(index: &FlatIpIndex, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let dim = u32::try_from(index.dim()).map_err(|_| Error::InvalidInput(format!("dimension {} too large", index.dim())))?;
    let mut buf = Vec::with_capacity(HEADER_LEN + index.raw().len() * 4);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&dim.to_le_bytes());
    buf.extend_from_slice(&(index.len() as u64).to_le_bytes());
    if cfg!(target_endian = "little") {
        buf.extend_from_slice(bytemuck::cast_slice(index.raw()));
    } else {
        for x in index.raw() {
            buf.extend_from_slice(&x.to_le_bytes());
        }
    }
    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, &buf)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), rows = index.len(), dim = index.dim(), "vector index persisted");
    Ok(())
}

pub fn load(path: &Path) -> Result<FlatIpIndex> {
    decode(path, &fs::read(path)?)
}

/// Parse a `vectors.bin` image already read into memory.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<FlatIpIndex> {
    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(Error::corrupt(path, "not a vector index file"));
    }
    let dim = read_u32(&bytes[8..12]) as usize;
    let rows = read_u64(&bytes[12..20]);
    if dim == 0 {
        return Err(Error::corrupt(path, "zero dimension"));
    }
    let expected = usize::try_from(rows)
        .ok()
        .and_then(|r| r.checked_mul(dim))
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::corrupt(path, "row count overflows"))?;
    let body = &bytes[HEADER_LEN..];
    if body.len() != expected {
        return Err(Error::corrupt(path, format!("expected {expected} data bytes, found {}", body.len())));
    }
    let data: Vec<f32> = if cfg!(target_endian = "little") {
        bytemuck::pod_collect_to_vec(body)
    } else {
        body.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
    };
    Ok(FlatIpIndex::from_raw(dim, data))
}

fn read_u32(b: &[u8]) -> u32 {
    let mut a = [0u8; 4];
    a.copy_from_slice(b);
    u32::from_le_bytes(a)
}

fn read_u64(b: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(b);
    u64::from_le_bytes(a)
}
