use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::download::{DownloadOptions, DEFAULT_WORKERS};
use crate::fetch::FetchOptions;

/// Global configuration loaded from `~/.config/adimg/config.toml`.
/// Every field is optional in the file; missing ones take the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdimgConfig {
    /// Truth rows `[url, ad_id, label]`, no header.
    pub ad_image_csv: PathBuf,
    /// Rows `[ad_id, phone_id]`, no header.
    pub ad_phone_csv: PathBuf,
    /// Root directory for downloaded images.
    pub image_output_dir: PathBuf,
    /// Directory the seven mapping files are written to.
    pub maps_dir: PathBuf,
    /// Number of concurrent download workers.
    pub workers: usize,
    /// TCP/TLS connect timeout per request.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout, body included.
    pub request_timeout_secs: u64,
    /// Nest images under a directory named after the URL host.
    pub host_dir: bool,
}

impl Default for AdimgConfig {
    fn default() -> Self {
        Self {
            ad_image_csv: PathBuf::from("ad-images.source.url_ad_label.csv"),
            ad_phone_csv: PathBuf::from("ad-images.source.ad_phone.csv"),
            image_output_dir: PathBuf::from("ad-images"),
            maps_dir: PathBuf::from("."),
            workers: DEFAULT_WORKERS,
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            host_dir: false,
        }
    }
}

impl AdimgConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn download_options(&self, refetch: bool) -> DownloadOptions {
        DownloadOptions {
            output_root: self.image_output_dir.clone(),
            workers: self.workers.max(1),
            host_dir: self.host_dir,
            refetch,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("adimg")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AdimgConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AdimgConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<AdimgConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AdimgConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AdimgConfig::default();
        assert_eq!(cfg.ad_image_csv, PathBuf::from("ad-images.source.url_ad_label.csv"));
        assert_eq!(cfg.ad_phone_csv, PathBuf::from("ad-images.source.ad_phone.csv"));
        assert_eq!(cfg.image_output_dir, PathBuf::from("ad-images"));
        assert_eq!(cfg.workers, 128);
        assert!(!cfg.host_dir);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = AdimgConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AdimgConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.ad_image_csv, cfg.ad_image_csv);
        assert_eq!(parsed.maps_dir, cfg.maps_dir);
        assert_eq!(parsed.workers, cfg.workers);
        assert_eq!(parsed.request_timeout_secs, cfg.request_timeout_secs);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            workers = 32
            image_output_dir = "/data/ad-images"
            host_dir = true
        "#;
        let cfg: AdimgConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 32);
        assert_eq!(cfg.image_output_dir, PathBuf::from("/data/ad-images"));
        assert!(cfg.host_dir);
        assert_eq!(cfg.connect_timeout_secs, 30);
        assert_eq!(cfg.ad_phone_csv, PathBuf::from("ad-images.source.ad_phone.csv"));
    }

    #[test]
    fn options_follow_config() {
        let cfg = AdimgConfig {
            workers: 0,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            ..AdimgConfig::default()
        };
        let dl = cfg.download_options(true);
        assert_eq!(dl.workers, 1);
        assert!(dl.refetch);
        assert_eq!(dl.output_root, PathBuf::from("ad-images"));
        let fetch = cfg.fetch_options();
        assert_eq!(fetch.connect_timeout, Duration::from_secs(5));
        assert_eq!(fetch.timeout, Duration::from_secs(10));
    }

    #[test]
    fn load_from_path_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
