//! Ingestion orchestrator implementation.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::admission::{AdmissionController, Disposition};
use crate::artifact::{ArtifactLoader, ArtifactRecord, PreparedArtifact};
use crate::backend::{fetch_status, AnalysisBackend, QueueSnapshot};
use crate::config::Config;
use crate::poll::Poller;

use super::types::{AdmissionState, BatchHalt, BatchReport, OrchestratorError};

/// Drives a batch of artifact records through admission, in order.
pub struct IngestionOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    loader: Arc<dyn ArtifactLoader>,
    admission: AdmissionController,
    poller: Poller,
}

impl IngestionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: &Config,
        backend: Arc<dyn AnalysisBackend>,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        let poller = Poller::from_config(&config.poll);
        let admission =
            AdmissionController::new(Arc::clone(&backend), config.admission.clone(), poller);

        Self {
            backend,
            loader,
            admission,
            poller,
        }
    }

    /// Wait for the backend to report status, then check that it offers
    /// every required plugin.
    pub async fn preflight(&self) -> Result<QueueSnapshot, OrchestratorError> {
        info!("Checking {} backend", self.backend.name());
        debug!(
            interval = ?self.poller.interval(),
            liveness_every = self.poller.liveness_every(),
            "Polling cadence"
        );
        let snapshot = fetch_status(self.backend.as_ref(), &self.poller).await?;

        let required = &self.admission.config().required_plugins;
        let missing = snapshot.missing_plugins(required);
        if !missing.is_empty() {
            error!("Backend does not support all required plugins:");
            for plugin in &missing {
                error!("- {}", plugin);
            }
            return Err(OrchestratorError::MissingCapability {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        info!(
            queue_len = snapshot.queue_len(),
            "Backend ready with {} plugin(s)",
            snapshot.plugins.len()
        );
        Ok(snapshot)
    }

    /// Run the preflight, then process every record in order.
    ///
    /// Returns `Err` only when the batch could not start. A failure while
    /// processing stops the batch and is reported in [`BatchReport::halted`].
    pub async fn run_batch<I>(&self, records: I) -> Result<BatchReport, OrchestratorError>
    where
        I: IntoIterator<Item = ArtifactRecord>,
    {
        self.preflight().await?;

        let mut state = AdmissionState::default();
        let mut halted = None;

        for (index, record) in records.into_iter().enumerate() {
            let position = index + 1;
            debug!(position, "Processing {}", record.label());

            let error = match self.process(&record).await {
                Ok(Disposition::Skipped { .. }) => {
                    state.skipped += 1;
                    continue;
                }
                Ok(Disposition::Admitted { uid, queue_len }) => {
                    state.submitted += 1;
                    debug!(%uid, queue_len, "Admitted");
                    info!("Uploaded {} file(s)", state.submitted);
                    continue;
                }
                Ok(Disposition::Rejected { status, body, .. }) => {
                    OrchestratorError::SubmissionRejected { status, body }
                }
                Err(e) => e,
            };

            state.failed += 1;
            error!(position, "Failed to upload {}: {}", record.file_name, error);
            halted = Some(BatchHalt {
                position,
                record,
                error,
            });
            break;
        }

        if halted.is_none() {
            info!("Finished uploading all files");
        }
        info!(
            submitted = state.submitted,
            skipped = state.skipped,
            failed = state.failed,
            "Batch finished"
        );

        Ok(BatchReport { state, halted })
    }

    /// Load, identify and admit a single record.
    async fn process(&self, record: &ArtifactRecord) -> Result<Disposition, OrchestratorError> {
        let content = self.loader.load(record).await?;
        let artifact = PreparedArtifact::new(record.clone(), content);
        debug!(id = %artifact.id, "Loaded {} byte(s)", artifact.content.len());

        Ok(self.admission.admit(&artifact).await?)
    }
}
