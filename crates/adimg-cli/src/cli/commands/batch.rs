//! `adimg run` – full download + join + emit batch.

use anyhow::Result;
use adimg_core::batch;
use adimg_core::config::AdimgConfig;
use adimg_core::fetch::CurlFetcher;
use std::sync::Arc;
use std::time::Instant;

pub fn run_batch(cfg: &AdimgConfig, refetch: bool) -> Result<()> {
    let started = Instant::now();
    let fetcher = Arc::new(CurlFetcher::new(cfg.fetch_options()));
    let summary = batch::run_batch(cfg, fetcher, refetch)?;

    println!("{} unique URLs", summary.unique_urls);
    println!(
        "Downloaded {} images ({} fetched, {} already on disk)",
        summary.downloaded, summary.fetched, summary.reused
    );
    println!("Total files skipped: {}", summary.skipped_urls);
    println!("Total files included: {}", summary.included_urls);
    for path in &summary.outputs {
        println!("  wrote {}", path.display());
    }
    tracing::info!("run completed in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}
