//! CSV metadata source.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::artifact::{epoch_sentinel, ArtifactRecord};

use super::MetadataError;

/// One row of the metadata spreadsheet. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    device_name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    tags: String,
}

impl CsvRow {
    fn into_record(self, line: u64) -> Result<ArtifactRecord, MetadataError> {
        let file_name = self.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(MetadataError::MissingField {
                line,
                field: "file_name",
            });
        }

        let file_path = self.file_path.trim().to_string();
        if has_parent_segment(&file_path) || has_parent_segment(&file_name) {
            return Err(MetadataError::UnsafePath {
                line,
                value: format!("{}/{}", file_path, file_name),
            });
        }

        Ok(ArtifactRecord {
            vendor: self.vendor.trim().to_string(),
            device_name: self.device_name.trim().to_string(),
            version: self.version.trim().to_string(),
            release_date: parse_release_date(&self.release_date, line)?,
            file_path,
            file_name,
            tags: parse_tags(&self.tags),
        })
    }
}

fn has_parent_segment(value: &str) -> bool {
    value.split(['/', '\\']).any(|s| s.trim() == "..")
}

fn parse_release_date(value: &str, line: u64) -> Result<NaiveDate, MetadataError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(epoch_sentinel());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| MetadataError::InvalidDate {
        line,
        value: value.to_string(),
    })
}

fn parse_tags(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read all artifact records from a CSV file, in file order.
pub fn read_records(path: &Path) -> Result<Vec<ArtifactRecord>, MetadataError> {
    let file = File::open(path).map_err(|e| MetadataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let records = parse_records(file)?;
    info!(
        "Read {} artifact records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parse artifact records from any CSV reader with a header row.
///
/// Rows whose vendor column is blank are skipped.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<ArtifactRecord>, MetadataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut blank = 0usize;
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let parsed: CsvRow = row.deserialize(Some(&headers))?;

        if parsed.vendor.trim().is_empty() {
            blank += 1;
            continue;
        }
        records.push(parsed.into_record(line)?);
    }

    if blank > 0 {
        debug!("Skipped {} rows without a vendor", blank);
    }
    Ok(records)
}
