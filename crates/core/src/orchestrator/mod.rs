//! Batch ingestion orchestrator.
//!
//! Runs a preflight against the backend, then feeds artifacts one at a time
//! through the admission controller in source order. The first failure stops
//! the batch.

mod runner;
mod types;

pub use runner::IngestionOrchestrator;
pub use types::{AdmissionState, BatchHalt, BatchReport, OrchestratorError};
