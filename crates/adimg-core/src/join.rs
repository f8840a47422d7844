//! Relational join of truth rows against downloaded images.
//!
//! One sequential pass over the ad-image rows builds the seven output
//! mappings. Label consistency is enforced per ad, per image checksum and per
//! phone: the first disagreement aborts the join, since silently picking a
//! label would corrupt the training truth.

use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use crate::download::DownloadResult;
use crate::truth::AdRecord;

/// The seven cross-reference mappings. Ordered maps and sets keep the emitted
/// files stable between runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Mappings {
    pub sha2path: BTreeMap<String, String>,
    pub ad2shas: BTreeMap<String, BTreeSet<String>>,
    pub ad2label: BTreeMap<String, String>,
    pub sha2label: BTreeMap<String, String>,
    pub phone2ads: BTreeMap<String, BTreeSet<String>>,
    pub phone2label: BTreeMap<String, String>,
    pub phone2shas: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("conflicting truth label for image '{path}' (sha1: {checksum}): '{existing}' vs '{found}'")]
    ChecksumLabel {
        checksum: String,
        path: String,
        existing: String,
        found: String,
    },
    #[error("conflicting truth label for phone '{phone}': '{existing}' vs '{found}'")]
    PhoneLabel {
        phone: String,
        existing: String,
        found: String,
    },
    #[error("conflicting truth label for ad '{ad_id}': '{existing}' vs '{found}'")]
    AdLabel {
        ad_id: String,
        existing: String,
        found: String,
    },
    #[error("no phone mapping for ad '{0}'")]
    MissingPhone(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JoinOutput {
    pub mappings: Mappings,
    /// URLs that contributed to the mappings.
    pub included_urls: BTreeSet<String>,
    /// URLs referenced by rows but absent from the download results.
    pub skipped_urls: BTreeSet<String>,
}

/// Join `rows` with the download results and the ad→phone map.
pub fn join(
    rows: &[AdRecord],
    ad2phone: &HashMap<String, String>,
    downloads: &HashMap<String, DownloadResult>,
) -> Result<JoinOutput, JoinError> {
    let mut out = JoinOutput::default();
    let m = &mut out.mappings;

    for row in rows {
        let Some(dl) = downloads.get(&row.url) else {
            out.skipped_urls.insert(row.url.clone());
            continue;
        };
        let phone = ad2phone
            .get(&row.ad_id)
            .ok_or_else(|| JoinError::MissingPhone(row.ad_id.clone()))?;
        let sha = &dl.checksum;
        let path = dl.filepath.display().to_string();

        insert_label(&mut m.ad2label, &row.ad_id, &row.label).map_err(|existing| JoinError::AdLabel {
            ad_id: row.ad_id.clone(),
            existing,
            found: row.label.clone(),
        })?;
        insert_label(&mut m.sha2label, sha, &row.label).map_err(|existing| JoinError::ChecksumLabel {
            checksum: sha.clone(),
            path: path.clone(),
            existing,
            found: row.label.clone(),
        })?;
        insert_label(&mut m.phone2label, phone, &row.label).map_err(|existing| JoinError::PhoneLabel {
            phone: phone.clone(),
            existing,
            found: row.label.clone(),
        })?;

        m.sha2path.insert(sha.clone(), path);
        m.ad2shas.entry(row.ad_id.clone()).or_default().insert(sha.clone());
        m.phone2ads.entry(phone.clone()).or_default().insert(row.ad_id.clone());
        m.phone2shas.entry(phone.clone()).or_default().insert(sha.clone());

        out.included_urls.insert(row.url.clone());
    }

    Ok(out)
}

/// Record `label` for `key`, or return the different label already recorded.
fn insert_label(map: &mut BTreeMap<String, String>, key: &str, label: &str) -> Result<(), String> {
    match map.entry(key.to_string()) {
        Entry::Vacant(e) => {
            e.insert(label.to_string());
            Ok(())
        }
        Entry::Occupied(e) if e.get() == label => Ok(()),
        Entry::Occupied(e) => Err(e.get().clone()),
    }
}
