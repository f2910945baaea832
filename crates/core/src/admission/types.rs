//! Types for the admission controller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendError;
use crate::identifier::ContentId;

/// Errors that abort an admission.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The backend could not be reached or answered nonsense.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Phase of a single admission, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPhase {
    CheckingDuplicate,
    ReadyToSubmit,
    AwaitingQueueEntry,
    AwaitingSlot,
}

impl AdmissionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionPhase::CheckingDuplicate => "checking_duplicate",
            AdmissionPhase::ReadyToSubmit => "ready_to_submit",
            AdmissionPhase::AwaitingQueueEntry => "awaiting_queue_entry",
            AdmissionPhase::AwaitingSlot => "awaiting_slot",
        }
    }
}

/// Terminal outcome of admitting one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The backend already knows the artifact; nothing was submitted.
    Skipped { id: ContentId },
    /// Submitted, confirmed in the backend queue, and released.
    ///
    /// `queue_len` is the active-analysis count of the snapshot that
    /// released the artifact.
    Admitted { uid: ContentId, queue_len: usize },
    /// The backend refused the submission.
    Rejected {
        id: ContentId,
        status: i64,
        body: String,
    },
}
