//! Checksum command: compute SHA-1 of a file.

use anyhow::Result;
use adimg_core::checksum;
use std::path::Path;

/// Compute and print SHA-1 of the given file.
pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha1_path(path)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
