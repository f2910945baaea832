//! FACT REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::identifier::ContentId;

use super::{AnalysisBackend, BackendError, QueueSnapshot, SubmissionOutcome, SubmissionRequest};

/// HTTP client for a FACT analysis backend.
pub struct FactClient {
    client: Client,
    config: BackendConfig,
}

impl FactClient {
    /// Create a new FACT client.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| BackendError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Read the response status and body. HTTP error codes are not turned
    /// into errors here because FACT reports failures inside JSON bodies.
    async fn read(response: reqwest::Response) -> Result<(StatusCode, String), BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::ApiError(e.to_string()))?;
        Ok((status, body))
    }
}

/// Either an object keyed by name or a plain list of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameSet {
    Keys(Map<String, Value>),
    List(Vec<String>),
}

impl NameSet {
    fn into_names(self) -> Vec<String> {
        match self {
            NameSet::Keys(map) => map.into_iter().map(|(k, _)| k).collect(),
            NameSet::List(list) => list,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    system_status: Option<RawSystemStatus>,
    #[serde(default)]
    plugins: Option<NameSet>,
}

#[derive(Debug, Deserialize)]
struct RawSystemStatus {
    backend: Option<RawBackendStatus>,
}

#[derive(Debug, Deserialize)]
struct RawBackendStatus {
    analysis: Option<RawAnalysisStatus>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysisStatus {
    current_analyses: Option<NameSet>,
    #[serde(default)]
    recently_finished_analyses: Option<NameSet>,
}

/// Parse a `/rest/status` body. `None` when the backend is not ready yet.
fn parse_status(body: &str) -> Option<QueueSnapshot> {
    let raw: RawStatus = serde_json::from_str(body).ok()?;
    let analysis = raw.system_status?.backend?.analysis?;
    let current = analysis
        .current_analyses
        .map(NameSet::into_names)
        .unwrap_or_default();
    let finished = analysis
        .recently_finished_analyses
        .map(NameSet::into_names)
        .unwrap_or_default();
    let plugins = raw.plugins.map(NameSet::into_names).unwrap_or_default();
    Some(QueueSnapshot::new(current, plugins).with_finished(finished))
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: Option<i64>,
    uid: Option<String>,
}

#[async_trait]
impl AnalysisBackend for FactClient {
    fn name(&self) -> &str {
        "fact"
    }

    async fn probe_status(&self) -> Result<Option<QueueSnapshot>, BackendError> {
        let response = self.client.get(self.url("/rest/status")).send().await?;
        let (status, body) = Self::read(response).await?;

        let snapshot = parse_status(&body);
        if snapshot.is_none() {
            debug!("Backend status not ready yet (HTTP {})", status);
        }
        Ok(snapshot)
    }

    async fn artifact_exists(&self, id: &ContentId) -> Result<bool, BackendError> {
        let endpoint = format!("/rest/firmware/{}", urlencoding::encode(id.as_str()));
        let response = self.client.get(self.url(&endpoint)).send().await?;
        let (status, body) = Self::read(response).await?;

        match serde_json::from_str::<StatusReply>(&body) {
            Ok(reply) => Ok(reply.status == Some(0)),
            Err(_) if status == StatusCode::NOT_FOUND => Ok(false),
            Err(e) => Err(BackendError::InvalidResponse(format!(
                "HTTP {} from firmware lookup: {}",
                status, e
            ))),
        }
    }

    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionOutcome, BackendError> {
        debug!(
            "Submitting {} ({} base64 bytes)",
            request.id,
            request.binary.len()
        );
        let response = self
            .client
            .put(self.url("/rest/firmware"))
            .json(request)
            .send()
            .await?;
        let (http_status, body) = Self::read(response).await?;

        // A body without a status field is treated as a rejection.
        let reply = serde_json::from_str::<StatusReply>(&body).ok();
        let status = reply.as_ref().and_then(|r| r.status).unwrap_or(1);

        if status != 0 {
            return Ok(SubmissionOutcome::Rejected { status, body });
        }

        let uid = match reply.and_then(|r| r.uid) {
            Some(uid) => ContentId::from_backend(uid),
            None => {
                warn!(
                    "Backend accepted {} without a uid (HTTP {}), assuming it",
                    request.id, http_status
                );
                request.id.clone()
            }
        };
        Ok(SubmissionOutcome::Accepted { uid })
    }
}
