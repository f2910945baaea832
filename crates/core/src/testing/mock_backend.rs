//! Simulated analysis backend for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backend::{
    AnalysisBackend, BackendError, QueueSnapshot, SubmissionOutcome, SubmissionRequest,
};
use crate::identifier::ContentId;

/// A backend call recorded for test assertions, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// Status probe. `queue_len` is the size of the returned active set.
    Status { ready: bool, queue_len: usize },
    /// Artifact lookup and its answer.
    Lookup { id: String, known: bool },
    /// Submission attempt.
    Submit { id: String },
}

#[derive(Debug)]
struct ActiveAnalysis {
    uid: String,
    /// Status probes that have observed this analysis so far.
    seen: u32,
}

#[derive(Debug)]
struct MockState {
    plugins: Vec<String>,
    known: HashSet<String>,
    active: Vec<ActiveAnalysis>,
    /// Analyses that left the active set, most recent last.
    finished: Vec<String>,
    report_finished: bool,
    instant_analyses: bool,
    /// Accepted submissions not yet visible in the active set, with the
    /// number of probes still to pass before they appear.
    pending: Vec<(String, u32)>,
    rejections: HashMap<String, (i64, String)>,
    not_ready_probes: u32,
    enqueue_delay: u32,
    analysis_probes: Option<u32>,
    next_error: Option<BackendError>,
    lookup_error: Option<BackendError>,
    calls: Vec<BackendCall>,
    submissions: Vec<SubmissionRequest>,
}

/// Mock implementation of the AnalysisBackend trait.
///
/// Simulates a backend queue that tests can script:
/// - Mark artifacts as already known (duplicates)
/// - Reject submissions of specific artifacts
/// - Delay queue entry and control how long analyses stay active
/// - Finish analyses before any status poll can see them
/// - Report "not ready" for the first N status probes
/// - Fail the next call with a transport error
///
/// # Example
///
/// ```rust,ignore
/// let backend = MockBackend::new();
/// backend.set_analysis_probes(Some(3)).await;
/// backend.add_known(&ContentId::of(b"old firmware")).await;
///
/// // ... run the orchestrator ...
///
/// let calls = backend.calls().await;
/// assert!(calls.iter().any(|c| matches!(c, BackendCall::Submit { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a ready backend advertising the default plugins, with an empty
    /// queue where analyses never finish on their own.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                plugins: vec![
                    "cpu_architecture".to_string(),
                    "software_components".to_string(),
                    "file_type".to_string(),
                ],
                known: HashSet::new(),
                active: Vec::new(),
                finished: Vec::new(),
                report_finished: true,
                instant_analyses: false,
                pending: Vec::new(),
                rejections: HashMap::new(),
                not_ready_probes: 0,
                enqueue_delay: 0,
                analysis_probes: None,
                next_error: None,
                lookup_error: None,
                calls: Vec::new(),
                submissions: Vec::new(),
            })),
        }
    }

    /// Replace the advertised plugin list.
    pub async fn set_plugins(&self, plugins: &[&str]) {
        self.state.lock().await.plugins = plugins.iter().map(|p| p.to_string()).collect();
    }

    /// Mark an artifact as already known to the backend.
    pub async fn add_known(&self, id: &ContentId) {
        self.state.lock().await.known.insert(id.to_string());
    }

    /// Put an artifact into the active-analysis set.
    pub async fn add_active(&self, uid: &str) {
        self.state.lock().await.active.push(ActiveAnalysis {
            uid: uid.to_string(),
            seen: 0,
        });
    }

    /// Reject every submission of this artifact with the given status.
    pub async fn reject(&self, id: &ContentId, status: i64, body: &str) {
        self.state
            .lock()
            .await
            .rejections
            .insert(id.to_string(), (status, body.to_string()));
    }

    /// Answer the next `n` status probes with a payload that is not ready.
    pub async fn set_not_ready_probes(&self, n: u32) {
        self.state.lock().await.not_ready_probes = n;
    }

    /// Accepted artifacts stay invisible for this many status probes.
    pub async fn set_enqueue_delay(&self, probes: u32) {
        self.state.lock().await.enqueue_delay = probes;
    }

    /// Each analysis finishes after being observed by this many status
    /// probes. `None` keeps analyses active forever.
    pub async fn set_analysis_probes(&self, probes: Option<u32>) {
        self.state.lock().await.analysis_probes = probes;
    }

    /// Accepted artifacts finish at once and never appear as active.
    pub async fn set_instant_analyses(&self, instant: bool) {
        self.state.lock().await.instant_analyses = instant;
    }

    /// Whether status payloads list recently finished analyses.
    pub async fn set_report_finished(&self, report: bool) {
        self.state.lock().await.report_finished = report;
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: BackendError) {
        self.state.lock().await.next_error = Some(error);
    }

    /// Configure the next artifact lookup to fail with the given error.
    /// Status requests are unaffected.
    pub async fn set_lookup_error(&self, error: BackendError) {
        self.state.lock().await.lookup_error = Some(error);
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of status probes answered so far.
    pub async fn status_probes(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Status { .. }))
            .count()
    }

    /// Identifiers submitted so far, in order.
    pub async fn submitted_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Submit { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Submission payloads received so far.
    pub async fn submissions(&self) -> Vec<SubmissionRequest> {
        self.state.lock().await.submissions.clone()
    }

    /// Identifiers currently under analysis.
    pub async fn active(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .active
            .iter()
            .map(|a| a.uid.clone())
            .collect()
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_status(&self) -> Result<Option<QueueSnapshot>, BackendError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        if state.not_ready_probes > 0 {
            state.not_ready_probes -= 1;
            state.calls.push(BackendCall::Status {
                ready: false,
                queue_len: 0,
            });
            return Ok(None);
        }

        // Promote pending submissions whose delay has passed
        let mut still_pending = Vec::new();
        for (uid, remaining) in std::mem::take(&mut state.pending) {
            if remaining == 0 {
                state.known.insert(uid.clone());
                state.active.push(ActiveAnalysis { uid, seen: 0 });
            } else {
                still_pending.push((uid, remaining - 1));
            }
        }
        state.pending = still_pending;

        let mut snapshot = QueueSnapshot::new(
            state.active.iter().map(|a| a.uid.clone()),
            state.plugins.clone(),
        );
        if state.report_finished {
            snapshot = snapshot.with_finished(state.finished.clone());
        }
        state.calls.push(BackendCall::Status {
            ready: true,
            queue_len: snapshot.queue_len(),
        });

        // Age analyses after answering
        if let Some(limit) = state.analysis_probes {
            for analysis in state.active.iter_mut() {
                analysis.seen += 1;
            }
            let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut state.active)
                .into_iter()
                .partition(|a| a.seen >= limit);
            state.active = running;
            state.finished.extend(done.into_iter().map(|a| a.uid));
        }

        Ok(Some(snapshot))
    }

    async fn artifact_exists(&self, id: &ContentId) -> Result<bool, BackendError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.next_error.take().or_else(|| state.lookup_error.take()) {
            return Err(error);
        }

        let known = state.known.contains(id.as_str());
        state.calls.push(BackendCall::Lookup {
            id: id.to_string(),
            known,
        });
        Ok(known)
    }

    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionOutcome, BackendError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        let id = request.id.to_string();
        state.calls.push(BackendCall::Submit { id: id.clone() });
        state.submissions.push(request.clone());

        if let Some((status, body)) = state.rejections.get(&id).cloned() {
            return Ok(SubmissionOutcome::Rejected { status, body });
        }

        let delay = state.enqueue_delay;
        if state.instant_analyses {
            state.known.insert(id.clone());
            state.finished.push(id.clone());
        } else if delay == 0 {
            state.known.insert(id.clone());
            state.active.push(ActiveAnalysis {
                uid: id.clone(),
                seen: 0,
            });
        } else {
            state.pending.push((id.clone(), delay));
        }

        Ok(SubmissionOutcome::Accepted {
            uid: ContentId::from_backend(id),
        })
    }
}
