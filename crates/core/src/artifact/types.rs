//! Types describing a single firmware artifact.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::ContentId;

/// Errors raised while loading artifact bytes.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Artifact location leaves the artifact root: {0}")]
    OutsideRoot(String),

    #[error("Failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Release date used when the metadata leaves it empty.
pub fn epoch_sentinel() -> NaiveDate {
    // chrono's default date is 1970-01-01
    NaiveDate::default()
}

/// One firmware unit to ingest, as described by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub vendor: String,
    pub device_name: String,
    pub version: String,
    pub release_date: NaiveDate,
    /// Directory below `<root>/<vendor>` holding the image.
    pub file_path: String,
    pub file_name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ArtifactRecord {
    /// Short human-readable label for log lines.
    pub fn label(&self) -> String {
        format!(
            "{} {} {} ({})",
            self.vendor, self.device_name, self.version, self.file_name
        )
    }
}

/// A record together with its loaded content and identifier.
#[derive(Debug, Clone)]
pub struct PreparedArtifact {
    pub record: ArtifactRecord,
    pub id: ContentId,
    pub content: Vec<u8>,
}

impl PreparedArtifact {
    pub fn new(record: ArtifactRecord, content: Vec<u8>) -> Self {
        let id = ContentId::of(&content);
        Self {
            record,
            id,
            content,
        }
    }
}

/// Loads the raw bytes of an artifact.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    /// Load the (possibly truncated) content of the record's artifact.
    async fn load(&self, record: &ArtifactRecord) -> Result<Vec<u8>, ArtifactError>;
}
