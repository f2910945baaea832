//! In-memory artifact loader for testing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::artifact::{ArtifactError, ArtifactLoader, ArtifactRecord};

/// Serves artifact bytes from memory, keyed by file name.
///
/// Records whose file name was never registered fail with
/// `ArtifactError::NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactLoader {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    loads: Arc<RwLock<Vec<String>>>,
}

impl MemoryArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content returned for `file_name`.
    pub async fn insert(&self, file_name: &str, content: &[u8]) {
        self.files
            .write()
            .await
            .insert(file_name.to_string(), content.to_vec());
    }

    /// File names loaded so far, in order.
    pub async fn loads(&self) -> Vec<String> {
        self.loads.read().await.clone()
    }
}

#[async_trait]
impl ArtifactLoader for MemoryArtifactLoader {
    async fn load(&self, record: &ArtifactRecord) -> Result<Vec<u8>, ArtifactError> {
        self.loads.write().await.push(record.file_name.clone());
        self.files
            .read()
            .await
            .get(&record.file_name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(PathBuf::from(&record.file_name)))
    }
}
