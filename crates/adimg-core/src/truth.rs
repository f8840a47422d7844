//! Loading the truth CSVs.
//!
//! Both files are headerless and read whole. Column counts are checked per
//! record so a malformed line is reported by number instead of shifting
//! values into the wrong mapping.

use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of the ad-image truth file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRecord {
    pub url: String,
    pub ad_id: String,
    pub label: String,
}

/// Read `[url, ad_id, label]` rows.
pub fn load_ad_images(path: &Path) -> Result<Vec<AdRecord>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    parse_ad_images(file).with_context(|| format!("parse {}", path.display()))
}

/// Read `[ad_id, phone_id]` rows into a map. A repeated ad keeps its last phone.
pub fn load_ad_phones(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    parse_ad_phones(file).with_context(|| format!("parse {}", path.display()))
}

/// The distinct URLs referenced by `rows`.
pub fn unique_urls(rows: &[AdRecord]) -> BTreeSet<String> {
    rows.iter().map(|r| r.url.clone()).collect()
}

pub fn parse_ad_images<R: Read>(input: R) -> Result<Vec<AdRecord>> {
    let mut rows = Vec::new();
    for (n, record) in reader(input).records().enumerate() {
        let record = record.with_context(|| format!("record {}", n + 1))?;
        let [url, ad_id, label] = fields::<3>(&record, n + 1)?;
        rows.push(AdRecord { url, ad_id, label });
    }
    Ok(rows)
}

pub fn parse_ad_phones<R: Read>(input: R) -> Result<HashMap<String, String>> {
    let mut ad2phone = HashMap::new();
    for (n, record) in reader(input).records().enumerate() {
        let record = record.with_context(|| format!("record {}", n + 1))?;
        let [ad_id, phone_id] = fields::<2>(&record, n + 1)?;
        ad2phone.insert(ad_id, phone_id);
    }
    Ok(ad2phone)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

fn fields<const N: usize>(record: &StringRecord, n: usize) -> Result<[String; N]> {
    if record.len() != N {
        anyhow::bail!("record {}: expected {} columns, found {}", n, N, record.len());
    }
    Ok(std::array::from_fn(|i| record[i].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ad_image_rows() {
        let input = "http://a.co/x/y.jpg,ad1,spam\n\"http://a.co/x/z,1.jpg\",ad2,not spam\n";
        let rows = parse_ad_images(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            AdRecord {
                url: "http://a.co/x/y.jpg".into(),
                ad_id: "ad1".into(),
                label: "spam".into(),
            }
        );
        assert_eq!(rows[1].url, "http://a.co/x/z,1.jpg");
        assert_eq!(rows[1].label, "not spam");
    }

    #[test]
    fn first_row_is_data_not_header() {
        let rows = parse_ad_images("url,ad_id,label\n".as_bytes()).unwrap();
        assert_eq!(rows[0].url, "url");
    }

    #[test]
    fn wrong_column_count_names_record() {
        let err = parse_ad_images("a,b,c\nd,e\n".as_bytes()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("record 2"), "{}", msg);
        assert!(msg.contains("expected 3 columns, found 2"), "{}", msg);
    }

    #[test]
    fn ad_phone_last_row_wins() {
        let map = parse_ad_phones("ad1,555\nad2,555\nad1,777\n".as_bytes()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["ad1"], "777");
        assert_eq!(map["ad2"], "555");
    }

    #[test]
    fn unique_urls_dedupes() {
        let rows = parse_ad_images("u1,a,x\nu1,b,x\nu2,c,y\n".as_bytes()).unwrap();
        let urls = unique_urls(&rows);
        assert_eq!(urls.into_iter().collect::<Vec<_>>(), vec!["u1", "u2"]);
    }

    #[test]
    fn load_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ad_phones(&dir.path().join("absent.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.csv"));
    }
}
