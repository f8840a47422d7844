//! `adimg fetch <url>` – download one image.

use anyhow::Result;
use adimg_core::config::AdimgConfig;
use adimg_core::download;
use adimg_core::fetch::CurlFetcher;

/// Download `url` and print `checksum  path`.
pub fn run_fetch(cfg: &AdimgConfig, url: &str, refetch: bool) -> Result<()> {
    let fetcher = CurlFetcher::new(cfg.fetch_options());
    let result = download::download_one(url, &fetcher, &cfg.download_options(refetch))
        .map_err(|reason| anyhow::anyhow!("skipped '{}': {}", url, reason))?;
    println!("{}  {}", result.checksum, result.filepath.display());
    Ok(())
}
