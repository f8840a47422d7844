//! tracing setup for the `adimg` binary.
//!
//! Runs append to `$XDG_STATE_HOME/adimg/adimg.log`. `RUST_LOG` overrides the
//! default filter.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,adimg_core=debug";
const LOG_FILE: &str = "adimg.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the run log, creating its directory.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("adimg")?;
    dirs.place_state_file(LOG_FILE)
        .context("failed to create adimg state directory")
}

/// Send tracing output to the run log and return its path.
///
/// Fails before installing a subscriber, so the caller can still fall back
/// to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .init();
    Ok(path)
}

pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}
