//! Single-request HTTP GET with the whole body buffered in memory.
//!
//! Images are small, and the body has to be sniffed before the file name is
//! known, so nothing is streamed to disk here.

use std::time::Duration;
use thiserror::Error;

/// Why a GET produced no usable body. Both variants are skip signals for the
/// URL, never fatal to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (DNS, refused connection, timeout, bad URL).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
}

/// Source of response bodies. The production implementation is
/// [`CurlFetcher`]; the orchestrator only sees this trait.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
        }
    }
}

/// libcurl-backed fetcher. One `Easy` handle per request; safe to share
/// across worker threads.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    opts: FetchOptions,
}

impl CurlFetcher {
    pub fn new(opts: FetchOptions) -> Self {
        Self { opts }
    }
}

impl Fetch for CurlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.timeout(self.opts.timeout)?;
        easy.useragent(concat!("adimg/", env!("CARGO_PKG_VERSION")))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(body)
    }
}
