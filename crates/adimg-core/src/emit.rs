//! Serialization of the join mappings.
//!
//! Six mappings are pretty-printed JSON objects (sets become arrays); the
//! checksum → label truth file is a headerless two-column CSV, the format the
//! downstream classifier tooling reads. Each file is written atomically and
//! replaces any earlier output.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::join::Mappings;
use crate::storage;

pub const SHA2PATH_JSON: &str = "ad-images.map.sha2path.json";
pub const AD2SHAS_JSON: &str = "ad-images.map.ad2shas.json";
pub const AD2LABEL_JSON: &str = "ad-images.map.ad2label.json";
pub const SHA2LABEL_CSV: &str = "ad-images.map.sha2label.csv";
pub const PHONE2ADS_JSON: &str = "ad-images.map.phone2ads.json";
pub const PHONE2LABEL_JSON: &str = "ad-images.map.phone2label.json";
pub const PHONE2SHAS_JSON: &str = "ad-images.map.phone2shas.json";

/// Write all seven mapping files into `dir`, creating it if needed.
/// Returns the written paths in emission order.
pub fn emit_all(mappings: &Mappings, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let written = vec![
        write_json(dir, SHA2PATH_JSON, &mappings.sha2path)?,
        write_json(dir, AD2SHAS_JSON, &mappings.ad2shas)?,
        write_json(dir, AD2LABEL_JSON, &mappings.ad2label)?,
        write_label_csv(dir, &mappings.sha2label)?,
        write_json(dir, PHONE2ADS_JSON, &mappings.phone2ads)?,
        write_json(dir, PHONE2LABEL_JSON, &mappings.phone2label)?,
        write_json(dir, PHONE2SHAS_JSON, &mappings.phone2shas)?,
    ];
    Ok(written)
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let data = serde_json::to_vec_pretty(value).with_context(|| format!("encode {}", name))?;
    storage::write_atomic(&path, &data)?;
    tracing::debug!(path = %path.display(), "wrote mapping");
    Ok(path)
}

fn write_label_csv(dir: &Path, sha2label: &BTreeMap<String, String>) -> Result<PathBuf> {
    let path = dir.join(SHA2LABEL_CSV);
    storage::write_atomic(&path, &label_csv(sha2label)?)?;
    tracing::debug!(path = %path.display(), "wrote mapping");
    Ok(path)
}

/// `checksum,label` rows, no header.
fn label_csv<'a, I>(rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut w = csv::Writer::from_writer(Vec::new());
    for (sha, label) in rows {
        w.write_record([sha, label])?;
    }
    w.into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv buffer: {}", e.error()))
}
