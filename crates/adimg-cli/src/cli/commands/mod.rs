//! CLI command handlers. Each command is in its own file.

mod batch;
mod checksum;
mod fetch;

pub use batch::run_batch;
pub use checksum::run_checksum;
pub use fetch::run_fetch;
