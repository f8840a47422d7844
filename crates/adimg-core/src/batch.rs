//! End-to-end batch run: load truth CSVs, download unique URLs, join, emit.
//!
//! The join runs only after the whole download phase, and the mapping files
//! are written only after the join succeeds, so a truth-label conflict leaves
//! no new output behind.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AdimgConfig;
use crate::download;
use crate::emit;
use crate::fetch::Fetch;
use crate::join;
use crate::truth;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub unique_urls: usize,
    /// URLs with an image on disk (fetched or reused).
    pub downloaded: usize,
    pub fetched: usize,
    pub reused: usize,
    /// URLs referenced by truth rows but excluded from the mappings.
    pub skipped_urls: usize,
    pub included_urls: usize,
    pub outputs: Vec<PathBuf>,
}

/// Run the whole batch described by `cfg`.
pub fn run_batch(cfg: &AdimgConfig, fetcher: Arc<dyn Fetch>, refetch: bool) -> Result<RunSummary> {
    tracing::info!("loading resource files");
    let rows = truth::load_ad_images(&cfg.ad_image_csv)?;
    let ad2phone = truth::load_ad_phones(&cfg.ad_phone_csv)?;

    let urls = truth::unique_urls(&rows);
    tracing::info!("{} unique URLs in {} rows", urls.len(), rows.len());

    let report = download::download_all(urls.iter().cloned(), fetcher, &cfg.download_options(refetch))?;
    tracing::info!(
        "downloaded {} images ({} fetched, {} reused, {} failed)",
        report.results.len(),
        report.fetched(),
        report.reused(),
        report.skipped.len()
    );

    tracing::info!("forming relational mappings");
    let joined = join::join(&rows, &ad2phone, &report.results)
        .context("truth data conflict; no mapping files were written")?;
    tracing::info!("total files skipped: {}", joined.skipped_urls.len());
    tracing::info!("total files included: {}", joined.included_urls.len());

    tracing::info!("saving relational mappings to {}", cfg.maps_dir.display());
    let outputs = emit::emit_all(&joined.mappings, &cfg.maps_dir)?;

    Ok(RunSummary {
        unique_urls: urls.len(),
        downloaded: report.results.len(),
        fetched: report.fetched(),
        reused: report.reused(),
        skipped_urls: joined.skipped_urls.len(),
        included_urls: joined.included_urls.len(),
        outputs,
    })
}
