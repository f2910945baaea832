//! Types for analysis backend operations.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use crate::artifact::PreparedArtifact;
use crate::identifier::ContentId;

/// Device class sent with every submission.
pub const DEVICE_CLASS: &str = "router";

/// Device part sent with every submission.
pub const DEVICE_PART: &str = "complete";

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::ConnectionFailed(e.to_string())
        } else {
            BackendError::ApiError(e.to_string())
        }
    }
}

/// Point-in-time view of the backend.
///
/// Advisory only: the backend may have moved on by the time it is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Identifiers currently under analysis.
    pub active: BTreeSet<String>,
    /// Plugin names the backend supports.
    pub plugins: BTreeSet<String>,
    /// Identifiers whose analysis finished recently.
    pub finished: BTreeSet<String>,
}

impl QueueSnapshot {
    pub fn new<A, P>(active: A, plugins: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            active: active.into_iter().map(Into::into).collect(),
            plugins: plugins.into_iter().map(Into::into).collect(),
            finished: BTreeSet::new(),
        }
    }

    /// Attach the recently finished analyses.
    pub fn with_finished<F>(mut self, finished: F) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
    {
        self.finished = finished.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the identifier is currently under analysis.
    pub fn contains(&self, id: &ContentId) -> bool {
        self.active.contains(id.as_str())
    }

    /// Whether the identifier's analysis finished recently.
    pub fn has_finished(&self, id: &ContentId) -> bool {
        self.finished.contains(id.as_str())
    }

    /// Number of artifacts under analysis.
    pub fn queue_len(&self) -> usize {
        self.active.len()
    }

    /// Required plugins the backend does not advertise, in input order.
    pub fn missing_plugins<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|p| !self.plugins.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Payload of a firmware submission.
#[derive(Clone, Serialize)]
pub struct SubmissionRequest {
    /// Identifier the backend is expected to assign.
    #[serde(skip)]
    pub id: ContentId,
    pub vendor: String,
    pub device_name: String,
    pub device_class: String,
    pub device_part: String,
    pub version: String,
    pub release_date: String,
    /// Comma-separated tag list.
    pub tags: String,
    pub requested_analysis_systems: Vec<String>,
    pub file_name: String,
    /// Base64-encoded content.
    pub binary: String,
}

impl SubmissionRequest {
    /// Build the submission for a prepared artifact.
    pub fn build(artifact: &PreparedArtifact, plugins: &[String]) -> Self {
        let record = &artifact.record;
        Self {
            id: artifact.id.clone(),
            vendor: record.vendor.clone(),
            device_name: record.device_name.clone(),
            device_class: DEVICE_CLASS.to_string(),
            device_part: DEVICE_PART.to_string(),
            version: record.version.clone(),
            release_date: record.release_date.format("%Y-%m-%d").to_string(),
            tags: record.tags.iter().cloned().collect::<Vec<_>>().join(","),
            requested_analysis_systems: plugins.to_vec(),
            file_name: record.file_name.clone(),
            binary: STANDARD.encode(&artifact.content),
        }
    }
}

impl fmt::Debug for SubmissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionRequest")
            .field("id", &self.id)
            .field("vendor", &self.vendor)
            .field("device_name", &self.device_name)
            .field("version", &self.version)
            .field("release_date", &self.release_date)
            .field("file_name", &self.file_name)
            .field("requested_analysis_systems", &self.requested_analysis_systems)
            .field("binary_len", &self.binary.len())
            .finish()
    }
}

/// Backend verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Accepted; `uid` is the identifier the backend assigned.
    Accepted { uid: ContentId },
    /// Rejected with a non-zero status; `body` is the raw response.
    Rejected { status: i64, body: String },
}

/// The remote analysis backend.
///
/// Every method is a single request; none retries on its own.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Query the status endpoint once.
    ///
    /// Returns `Ok(None)` when the backend answered but is not ready yet
    /// (no recognizable status payload).
    async fn probe_status(&self) -> Result<Option<QueueSnapshot>, BackendError>;

    /// Whether the backend already knows this artifact.
    async fn artifact_exists(&self, id: &ContentId) -> Result<bool, BackendError>;

    /// Submit an artifact for analysis.
    async fn submit(&self, request: &SubmissionRequest)
        -> Result<SubmissionOutcome, BackendError>;
}
