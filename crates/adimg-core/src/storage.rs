//! Idempotent, atomic file materialization.
//!
//! Bytes go to a uniquely named temp file in the destination directory and
//! are then renamed over the final path, so a partially written image is
//! never visible under its real name. Concurrent writers to the same path
//! each rename a complete file; the last rename wins.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::checksum;
use crate::locate::Location;
use crate::sniff;

/// Suffix of in-flight temp files.
pub const TEMP_SUFFIX: &str = ".part";

/// Checksum of what is on disk after a write, and whether this call wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub checksum: String,
    pub fresh: bool,
}

/// A previously materialized file for a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingFile {
    pub path: PathBuf,
    pub checksum: String,
}

/// Result of probing a location for earlier downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existing {
    /// A file whose content sniffs to the extension it carries.
    Valid(ExistingFile),
    /// Only files whose content contradicts their extension were found.
    Stale(PathBuf),
    Absent,
}

/// Write `data` to `path` unless a file is already there.
///
/// When the file exists it is treated as authoritative: nothing is written
/// and the checksum is computed from the file on disk. The final rename never
/// replaces a file, so a writer that loses a race to the same path reports
/// the winner's checksum rather than its own.
pub fn write_once(path: &Path, data: &[u8]) -> Result<WriteOutcome> {
    if path.is_file() {
        return existing_outcome(path);
    }
    let tmp = staged(path, data)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(WriteOutcome {
            checksum: checksum::sha1_bytes(data),
            fresh: true,
        }),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "lost write race, keeping existing file");
            existing_outcome(path)
        }
        Err(e) => Err(e.error)
            .with_context(|| format!("failed to rename temp file to {}", path.display())),
    }
}

/// Write `data` to `path`, atomically replacing any existing file.
pub fn write_replace(path: &Path, data: &[u8]) -> Result<WriteOutcome> {
    write_atomic(path, data)?;
    Ok(WriteOutcome {
        checksum: checksum::sha1_bytes(data),
        fresh: true,
    })
}

/// Temp file in the same directory, then rename onto `path`, replacing any
/// existing file. The directory must already exist.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    staged(path, data)?
        .persist(path)
        .with_context(|| format!("failed to rename temp file to {}", path.display()))?;
    Ok(())
}

fn existing_outcome(path: &Path) -> Result<WriteOutcome> {
    Ok(WriteOutcome {
        checksum: checksum::sha1_path(path)?,
        fresh: false,
    })
}

/// Uniquely named, synced temp file next to `path` holding `data`.
fn staged(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("failed to write temp file {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .context("storage sync failed")?;
    Ok(tmp)
}

/// Look for an earlier download of `location` under any known extension,
/// in the classifier's table order. Existing files are re-sniffed so a file
/// whose content does not match its name is not trusted.
pub fn find_existing(location: &Location) -> Result<Existing> {
    let mut stale = None;
    for (_, ext) in sniff::EXTENSIONS {
        let path = location.file_path(ext);
        if !path.is_file() {
            continue;
        }
        let data = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        match sniff::classify(&data) {
            Ok(found) if found.ext == *ext => {
                return Ok(Existing::Valid(ExistingFile {
                    checksum: checksum::sha1_bytes(&data),
                    path,
                }));
            }
            Ok(found) => {
                tracing::warn!(path = %path.display(), content = found.mime, "existing file does not match its extension");
                stale.get_or_insert(path);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "existing file unusable: {}", e);
                stale.get_or_insert(path);
            }
        }
    }
    Ok(stale.map(Existing::Stale).unwrap_or(Existing::Absent))
}
