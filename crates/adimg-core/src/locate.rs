//! Deterministic on-disk location for a URL.
//!
//! `<root>/<path segments minus filename>/<stem>.<sniffed ext>`. The host is
//! dropped unless `host_dir` is set. Every segment is sanitized so a URL can
//! never address anything outside the output root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Basename used when the URL path ends in `/` or sanitizes to nothing.
const DEFAULT_BASENAME: &str = "image";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("URL has no hierarchical path")]
    NoPath,
}

/// Target directory and extension-less file name for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub dir: PathBuf,
    pub basename: String,
}

impl Location {
    /// Final file path once the extension is known.
    pub fn file_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.basename, ext))
    }

    /// Create the directory and its parents. Concurrent callers creating the
    /// same tree all succeed.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

/// Map `url` to its location under `output_root`.
pub fn locate(url: &str, output_root: &Path, host_dir: bool) -> Result<Location, LocateError> {
    let parsed = url::Url::parse(url)?;
    let mut segments: Vec<&str> = parsed.path_segments().ok_or(LocateError::NoPath)?.collect();
    let last = segments.pop().unwrap_or("");

    let mut dir = output_root.to_path_buf();
    if host_dir {
        if let Some(host) = parsed.host_str() {
            push_segment(&mut dir, host);
        }
    }
    for seg in segments {
        push_segment(&mut dir, seg);
    }

    let name = sanitize_segment(last);
    let basename = match strip_extension(&name) {
        "" => DEFAULT_BASENAME.to_string(),
        stem => stem.to_string(),
    };
    Ok(Location { dir, basename })
}

fn push_segment(dir: &mut PathBuf, raw: &str) {
    let seg = sanitize_segment(raw);
    if !seg.is_empty() {
        dir.push(seg);
    }
}

/// Drop the final `.ext`, like a file stem. A name that is only an extension
/// keeps its text.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// Sanitizes one path segment for Linux.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores (so `.` and `..` vanish)
/// - Limits length to NAME_MAX bytes
fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_underscore = false;

    for c in raw.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
