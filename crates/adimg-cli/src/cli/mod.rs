//! CLI for adimg.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use adimg_core::config;
use std::path::PathBuf;

use commands::{run_batch, run_checksum, run_fetch};

/// Top-level CLI for adimg.
#[derive(Debug, Parser)]
#[command(name = "adimg")]
#[command(about = "adimg: download ad images and build truth-label mappings", long_about = None)]
pub struct Cli {
    /// Log to stderr instead of the log file under the XDG state dir.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every image in the truth CSV and write the mapping files.
    Run {
        /// CSV of `url,ad_id,label` rows (no header).
        #[arg(long, value_name = "PATH")]
        ad_image_csv: Option<PathBuf>,
        /// CSV of `ad_id,phone_id` rows (no header).
        #[arg(long, value_name = "PATH")]
        ad_phone_csv: Option<PathBuf>,
        /// Root directory for downloaded images.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Directory for the mapping files.
        #[arg(long, value_name = "DIR")]
        maps_dir: Option<PathBuf>,
        /// Number of concurrent download workers.
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Fetch again even when an image from an earlier run is on disk.
        #[arg(long)]
        refetch: bool,
        /// Nest images under a directory named after the URL host.
        #[arg(long)]
        host_dir: bool,
    },

    /// Download a single URL into the image tree and print its checksum.
    Fetch {
        /// Direct HTTP/HTTPS URL of the image.
        url: String,
        /// Root directory for downloaded images.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Fetch again even when the image is already on disk.
        #[arg(long)]
        refetch: bool,
        /// Nest the image under a directory named after the URL host.
        #[arg(long)]
        host_dir: bool,
    },

    /// Compute SHA-1 of a file, as used for image identity.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Run {
                ad_image_csv,
                ad_phone_csv,
                output_dir,
                maps_dir,
                workers,
                refetch,
                host_dir,
            } => {
                let mut cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                if let Some(p) = ad_image_csv {
                    cfg.ad_image_csv = p;
                }
                if let Some(p) = ad_phone_csv {
                    cfg.ad_phone_csv = p;
                }
                if let Some(d) = output_dir {
                    cfg.image_output_dir = d;
                }
                if let Some(d) = maps_dir {
                    cfg.maps_dir = d;
                }
                if let Some(n) = workers {
                    cfg.workers = n;
                }
                cfg.host_dir |= host_dir;
                run_batch(&cfg, refetch)?;
            }
            CliCommand::Fetch {
                url,
                output_dir,
                refetch,
                host_dir,
            } => {
                let mut cfg = config::load_or_init()?;
                if let Some(d) = output_dir {
                    cfg.image_output_dir = d;
                }
                cfg.host_dir |= host_dir;
                run_fetch(&cfg, &url, refetch)?;
            }
            CliCommand::Checksum { path } => run_checksum(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
