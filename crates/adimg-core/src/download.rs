//! Concurrent download orchestrator.
//!
//! A fixed pool of worker threads pulls URLs from a shared queue and runs the
//! whole per-URL pipeline (locate → reuse-or-fetch → classify → write) on
//! each. Results come back over a channel keyed by URL, so completion order
//! does not matter. A failing URL only ever affects its own entry.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::fetch::{Fetch, FetchError};
use crate::locate::{locate, LocateError};
use crate::sniff::{self, UnknownContent};
use crate::storage::{self, Existing};

/// Default worker count. Work is network-bound, so this is far above the
/// core count.
pub const DEFAULT_WORKERS: usize = 128;

/// How often (in completed URLs) progress is logged.
const PROGRESS_EVERY: usize = 500;

/// Why a URL was left out of the results. Every variant excludes the URL from
/// all downstream mappings.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("{0}")]
    Locate(#[from] LocateError),
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Content(#[from] UnknownContent),
    /// Local filesystem failure (permissions, disk full). Logged at error level.
    #[error("storage: {0:#}")]
    Storage(anyhow::Error),
}

/// A URL whose image is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub url: String,
    pub filepath: PathBuf,
    /// SHA-1 (lowercase hex) of the bytes at `filepath`.
    pub checksum: String,
    /// False when an earlier run's file was reused without a network request.
    pub fetched: bool,
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_root: PathBuf,
    pub workers: usize,
    /// Nest images under a directory named after the URL host.
    pub host_dir: bool,
    /// Ignore files from earlier runs; fetch and overwrite.
    pub refetch: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("ad-images"),
            workers: DEFAULT_WORKERS,
            host_dir: false,
            refetch: false,
        }
    }
}

/// Outcome of a download phase: every input URL is in exactly one of the maps.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub results: HashMap<String, DownloadResult>,
    pub skipped: BTreeMap<String, SkipReason>,
}

impl DownloadReport {
    pub fn fetched(&self) -> usize {
        self.results.values().filter(|r| r.fetched).count()
    }

    pub fn reused(&self) -> usize {
        self.results.values().filter(|r| !r.fetched).count()
    }
}

/// Run the pipeline for every URL on a pool of `opts.workers` threads.
///
/// Returns `Err` only if a worker could not be started or panicked; per-URL
/// failures are recorded in `DownloadReport::skipped`.
pub fn download_all<I>(urls: I, fetcher: Arc<dyn Fetch>, opts: &DownloadOptions) -> Result<DownloadReport>
where
    I: IntoIterator<Item = String>,
{
    let queue: VecDeque<String> = urls.into_iter().collect();
    let count = queue.len();
    let mut report = DownloadReport::default();
    if count == 0 {
        return Ok(report);
    }

    let work = Arc::new(Mutex::new(queue));
    let (tx, rx) = mpsc::channel();
    let num_workers = opts.workers.max(1).min(count);
    tracing::debug!(urls = count, workers = num_workers, "starting download workers");

    let mut handles = Vec::with_capacity(num_workers);
    for i in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let fetcher = Arc::clone(&fetcher);
        let opts = opts.clone();
        let handle = std::thread::Builder::new()
            .name(format!("image-dl-{}", i))
            .spawn(move || loop {
                let next = match work.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some(url) = next else {
                    break;
                };
                let res = download_one(&url, fetcher.as_ref(), &opts);
                if tx.send((url, res)).is_err() {
                    break;
                }
            })
            .context("failed to spawn download worker")?;
        handles.push(handle);
    }
    drop(tx);

    for (url, res) in rx {
        match res {
            Ok(result) => {
                report.results.insert(url, result);
            }
            Err(reason) => {
                log_skip(&url, &reason);
                report.skipped.insert(url, reason);
            }
        }
        let done = report.results.len() + report.skipped.len();
        if done % PROGRESS_EVERY == 0 {
            tracing::info!("processed {} of {} URLs", done, count);
        }
    }

    for h in handles {
        h.join()
            .map_err(|e| anyhow::anyhow!("download worker panicked: {:?}", e))?;
    }
    Ok(report)
}

/// Fetch, classify and store a single URL.
///
/// An earlier run's file for the same location is reused without touching the
/// network unless `opts.refetch` is set or the file's content contradicts its
/// extension.
pub fn download_one(url: &str, fetcher: &dyn Fetch, opts: &DownloadOptions) -> Result<DownloadResult, SkipReason> {
    let location = locate(url, &opts.output_root, opts.host_dir)?;

    let mut overwrite = opts.refetch;
    if !opts.refetch {
        match storage::find_existing(&location).map_err(SkipReason::Storage)? {
            Existing::Valid(existing) => {
                tracing::info!(url = %url, path = %existing.path.display(), "already downloaded");
                return Ok(DownloadResult {
                    url: url.to_string(),
                    filepath: existing.path,
                    checksum: existing.checksum,
                    fetched: false,
                });
            }
            Existing::Stale(_) => overwrite = true,
            Existing::Absent => {}
        }
    }

    let body = fetcher.fetch(url)?;
    let classified = sniff::classify(&body)?;

    location
        .ensure_dir()
        .with_context(|| format!("failed to create {}", location.dir.display()))
        .map_err(SkipReason::Storage)?;
    let path = location.file_path(classified.ext);
    let written = if overwrite {
        storage::write_replace(&path, &body)
    } else {
        storage::write_once(&path, &body)
    };
    let outcome = written.map_err(SkipReason::Storage)?;

    if outcome.fresh {
        tracing::info!(url = %url, path = %path.display(), "downloaded");
    } else {
        tracing::info!(url = %url, path = %path.display(), "already downloaded");
    }
    Ok(DownloadResult {
        url: url.to_string(),
        filepath: path,
        checksum: outcome.checksum,
        fetched: true,
    })
}

fn log_skip(url: &str, reason: &SkipReason) {
    match reason {
        SkipReason::Storage(_) => tracing::error!(url = %url, "skipping: {}", reason),
        _ => tracing::warn!(url = %url, "skipping: {}", reason),
    }
}
