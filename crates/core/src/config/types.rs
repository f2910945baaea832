use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Analysis backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "https://fact.local")
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Accept self-signed or otherwise invalid TLS certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u32 {
    60
}

/// Where artifacts and their metadata come from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// CSV file listing one artifact per row
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
    /// Root directory holding `<vendor>/<file_path>/<file_name>`
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    /// Read at most this many bytes per artifact (None = whole file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_limit: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            artifact_root: default_artifact_root(),
            byte_limit: None,
        }
    }
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("ExtractedFirmware.csv")
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(".")
}

/// Admission policy towards the backend's analysis queue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionConfig {
    /// Maximum number of artifacts under active analysis before the next
    /// record is released.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// When false, only queue entry is confirmed; no slot is awaited.
    #[serde(default = "default_true")]
    pub limit_enabled: bool,
    /// Analysis plugins requested for every artifact. All of them must be
    /// advertised by the backend before the batch starts.
    #[serde(default = "default_required_plugins")]
    pub required_plugins: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            limit_enabled: true,
            required_plugins: default_required_plugins(),
        }
    }
}

fn default_concurrency_limit() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_required_plugins() -> Vec<String> {
    vec![
        "cpu_architecture".to_string(),
        "software_components".to_string(),
    ]
}

/// Polling cadence for every wait on the backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    /// Delay between two status queries (milliseconds).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Emit a liveness log line every this many polls.
    #[serde(default = "default_liveness_every")]
    pub liveness_every: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            liveness_every: default_liveness_every(),
        }
    }
}

fn default_interval() -> u64 {
    1000
}

fn default_liveness_every() -> u64 {
    30
}
