//! SHA-1 content checksums.
//!
//! The checksum is the content identity of a downloaded image: it keys the
//! truth-label joins, so it is always computed over the bytes that end up on
//! disk.

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// SHA-1 of an in-memory buffer as lowercase hex (40 chars).
pub fn sha1_bytes(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Compute SHA-1 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded.
pub fn sha1_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
