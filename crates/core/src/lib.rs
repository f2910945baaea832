pub mod admission;
pub mod artifact;
pub mod backend;
pub mod config;
pub mod identifier;
pub mod metadata;
pub mod orchestrator;
pub mod poll;
pub mod testing;

pub use admission::{AdmissionController, AdmissionError, AdmissionPhase, Disposition};
pub use artifact::{
    epoch_sentinel, ArtifactError, ArtifactLoader, ArtifactRecord, FsArtifactLoader,
    PreparedArtifact,
};
pub use backend::{
    fetch_status, AnalysisBackend, BackendError, FactClient, QueueSnapshot, SubmissionOutcome,
    SubmissionRequest,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, AdmissionConfig,
    BackendConfig, Config, ConfigError, PollConfig, SourceConfig,
};
pub use identifier::ContentId;
pub use metadata::{parse_records, read_records, MetadataError};
pub use orchestrator::{
    AdmissionState, BatchHalt, BatchReport, IngestionOrchestrator, OrchestratorError,
};
pub use poll::{PollWait, Poller};
