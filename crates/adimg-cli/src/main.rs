use adimg_core::logging;
use clap::Parser;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible; fall back to stderr so a
    // read-only state dir never blocks a run.
    if cli.log_stderr {
        logging::init_logging_stderr();
    } else {
        match logging::init_logging() {
            Ok(path) => tracing::info!(path = %path.display(), "adimg logging initialized"),
            Err(err) => {
                logging::init_logging_stderr();
                tracing::warn!("file logging unavailable, using stderr: {:#}", err);
            }
        }
    }

    if let Err(err) = cli.run() {
        tracing::error!("{:#}", err);
        eprintln!("adimg error: {:#}", err);
        std::process::exit(1);
    }
}
