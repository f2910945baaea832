//! Admission controller implementation.
//!
//! Each artifact walks through four phases:
//! - CheckingDuplicate: skip artifacts the backend already knows
//! - ReadyToSubmit: hand the artifact to the backend
//! - AwaitingQueueEntry: wait until the backend lists it as active
//! - AwaitingSlot: wait until the active set drops below the ceiling
//!
//! Every decision is taken on a freshly fetched snapshot. Nothing is held on
//! the backend between check and act, so the duplicate check is advisory.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::artifact::PreparedArtifact;
use crate::backend::{
    fetch_status, AnalysisBackend, BackendError, QueueSnapshot, SubmissionOutcome,
    SubmissionRequest,
};
use crate::config::AdmissionConfig;
use crate::identifier::ContentId;
use crate::poll::Poller;

use super::types::{AdmissionError, AdmissionPhase, Disposition};

/// Decides, per artifact, whether to skip or submit it, and holds the
/// caller back until the backend queue has room again.
pub struct AdmissionController {
    backend: Arc<dyn AnalysisBackend>,
    config: AdmissionConfig,
    poller: Poller,
}

impl AdmissionController {
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: AdmissionConfig, poller: Poller) -> Self {
        Self {
            backend,
            config,
            poller,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Run one artifact through the admission state machine.
    pub async fn admit(&self, artifact: &PreparedArtifact) -> Result<Disposition, AdmissionError> {
        let id = &artifact.id;

        debug!(phase = AdmissionPhase::CheckingDuplicate.as_str(), %id, "Checking backend");
        if self.backend.artifact_exists(id).await? {
            info!("{} already known to backend, skipping", artifact.record.label());
            return Ok(Disposition::Skipped { id: id.clone() });
        }

        debug!(phase = AdmissionPhase::ReadyToSubmit.as_str(), %id, "Submitting");
        let outcome = {
            let request = SubmissionRequest::build(artifact, &self.config.required_plugins);
            self.backend.submit(&request).await?
        };
        let uid = match outcome {
            SubmissionOutcome::Accepted { uid } => uid,
            SubmissionOutcome::Rejected { status, body } => {
                warn!(
                    status,
                    "Backend rejected {}: {}",
                    artifact.record.label(),
                    body
                );
                return Ok(Disposition::Rejected {
                    id: id.clone(),
                    status,
                    body,
                });
            }
        };
        if &uid != id {
            warn!("Backend assigned uid {} but expected {}", uid, id);
        }

        debug!(phase = AdmissionPhase::AwaitingQueueEntry.as_str(), %uid, "Waiting for queue entry");
        let snapshot = self.await_queue_entry(&uid).await?;
        info!("Joined queue");
        info!("Total queue length: {}", snapshot.queue_len());

        if !self.config.limit_enabled {
            return Ok(Disposition::Admitted {
                uid,
                queue_len: snapshot.queue_len(),
            });
        }

        debug!(
            phase = AdmissionPhase::AwaitingSlot.as_str(),
            ceiling = self.config.concurrency_limit,
            "Waiting for a free slot"
        );
        let queue_len = self.await_slot().await?;
        Ok(Disposition::Admitted { uid, queue_len })
    }

    /// Poll until the backend has taken `uid` in: listed as active, listed
    /// as recently finished, or known to a lookup after leaving the queue
    /// between two polls.
    async fn await_queue_entry(&self, uid: &ContentId) -> Result<QueueSnapshot, BackendError> {
        let mut wait = self.poller.wait("Joining queue");
        loop {
            let snapshot = fetch_status(self.backend.as_ref(), &self.poller).await?;
            if snapshot.contains(uid) {
                return Ok(snapshot);
            }
            if snapshot.has_finished(uid) || self.backend.artifact_exists(uid).await? {
                debug!(%uid, "Analysis finished before it was seen in the queue");
                return Ok(snapshot);
            }
            wait.tick().await;
        }
    }

    /// Poll until fewer than `concurrency_limit` analyses are active.
    /// Returns the queue length that released the wait.
    async fn await_slot(&self) -> Result<usize, BackendError> {
        let ceiling = self.config.concurrency_limit;
        let mut wait = self.poller.wait("Waiting for queue to process");
        loop {
            let snapshot = fetch_status(self.backend.as_ref(), &self.poller).await?;
            let queue_len = snapshot.queue_len();
            if queue_len < ceiling {
                if wait.polls() > 0 {
                    debug!("Slot free after {:?}", wait.elapsed());
                }
                return Ok(queue_len);
            }
            wait.tick().await;
        }
    }
}
