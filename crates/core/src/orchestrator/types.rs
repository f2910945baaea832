//! Types for the ingestion orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admission::AdmissionError;
use crate::artifact::{ArtifactError, ArtifactRecord};
use crate::backend::BackendError;

/// Errors that stop a batch.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The backend lacks analysis plugins the batch depends on.
    #[error("backend is missing required plugins: {}", .missing.join(", "))]
    MissingCapability { missing: Vec<String> },

    /// The backend refused a submission.
    #[error("submission rejected with status {status}: {body}")]
    SubmissionRejected { status: i64, body: String },

    /// Artifact bytes could not be read.
    #[error("artifact unreadable: {0}")]
    ArtifactUnreadable(#[from] ArtifactError),

    /// Admission aborted.
    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),

    /// Transport failure outside of admission.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Per-batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionState {
    /// Artifacts accepted by the backend.
    pub submitted: usize,
    /// Artifacts the backend already knew.
    pub skipped: usize,
    /// Artifacts that failed. At most one, since the batch stops there.
    pub failed: usize,
}

impl AdmissionState {
    /// Artifacts fully handled so far.
    pub fn processed(&self) -> usize {
        self.submitted + self.skipped + self.failed
    }
}

/// Where and why a batch stopped early.
#[derive(Debug)]
pub struct BatchHalt {
    /// 1-based position of the failing record in the batch.
    pub position: usize,
    pub record: ArtifactRecord,
    pub error: OrchestratorError,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub state: AdmissionState,
    /// Set when processing stopped before the end of the batch.
    pub halted: Option<BatchHalt>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}
