pub mod config;
pub mod logging;

pub mod batch;
pub mod checksum;
pub mod download;
pub mod emit;
pub mod fetch;
pub mod join;
pub mod locate;
pub mod sniff;
pub mod storage;
pub mod truth;
