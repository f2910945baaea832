//! Filesystem-backed artifact loader.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{ArtifactError, ArtifactLoader, ArtifactRecord};

/// Reads artifacts from `<root>/<vendor>/<file_path>/<file_name>`.
#[derive(Debug, Clone)]
pub struct FsArtifactLoader {
    root: PathBuf,
    byte_limit: Option<u64>,
}

impl FsArtifactLoader {
    pub fn new(root: impl Into<PathBuf>, byte_limit: Option<u64>) -> Self {
        Self {
            root: root.into(),
            byte_limit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the on-disk location of a record's artifact.
    ///
    /// `file_path` may use either `/` or `\` as separator (spreadsheets
    /// exported on Windows); each segment is joined as its own component.
    /// Locations that would leave the root are refused.
    pub fn path_for(&self, record: &ArtifactRecord) -> Result<PathBuf, ArtifactError> {
        let outside = || {
            ArtifactError::OutsideRoot(format!(
                "{}/{}/{}",
                record.vendor, record.file_path, record.file_name
            ))
        };
        if !is_plain_component(&record.vendor) || !is_plain_component(&record.file_name) {
            return Err(outside());
        }

        let mut path = self.root.join(&record.vendor);
        for segment in record
            .file_path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
        {
            if segment == ".." {
                return Err(outside());
            }
            path.push(segment);
        }
        path.push(&record.file_name);
        Ok(path)
    }
}

/// A single path component that stays where it is joined.
fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[async_trait]
impl ArtifactLoader for FsArtifactLoader {
    async fn load(&self, record: &ArtifactRecord) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(record)?;

        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ArtifactError::NotFound(path.clone())
            } else {
                ArtifactError::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let mut content = Vec::new();
        let read = match self.byte_limit {
            Some(limit) => file.take(limit).read_to_end(&mut content).await,
            None => {
                let mut file = file;
                file.read_to_end(&mut content).await
            }
        };
        read.map_err(|e| ArtifactError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!("Loaded {} bytes from {}", content.len(), path.display());
        Ok(content)
    }
}
