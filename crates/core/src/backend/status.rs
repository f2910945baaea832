//! Waiting for a usable status snapshot.

use tracing::debug;

use crate::poll::Poller;

use super::{AnalysisBackend, BackendError, QueueSnapshot};

/// Fetch a status snapshot, waiting out a backend that is still starting.
///
/// Probes once per poll interval until the backend returns a well-formed
/// status payload. There is no upper bound on the wait; a liveness line is
/// logged at the poller's cadence. Transport errors are returned as-is.
pub async fn fetch_status(
    backend: &dyn AnalysisBackend,
    poller: &Poller,
) -> Result<QueueSnapshot, BackendError> {
    let mut wait = poller.wait("Waiting for backend status");
    loop {
        if let Some(snapshot) = backend.probe_status().await? {
            if wait.polls() > 0 {
                debug!(
                    "{} status ready after {} polls",
                    backend.name(),
                    wait.polls()
                );
            }
            return Ok(snapshot);
        }
        wait.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use std::time::Duration;

    fn poller() -> Poller {
        Poller::new(Duration::from_millis(1), 30)
    }

    #[tokio::test]
    async fn test_ready_backend_answers_immediately() {
        let backend = MockBackend::new();
        let snapshot = fetch_status(&backend, &poller()).await.unwrap();
        assert_eq!(snapshot.queue_len(), 0);
        assert_eq!(backend.status_probes().await, 1);
    }

    #[tokio::test]
    async fn test_waits_until_backend_ready() {
        let backend = MockBackend::new();
        backend.set_not_ready_probes(3).await;

        let snapshot = fetch_status(&backend, &poller()).await.unwrap();
        assert!(snapshot.plugins.contains("cpu_architecture"));
        assert_eq!(backend.status_probes().await, 4);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let backend = MockBackend::new();
        backend
            .set_next_error(BackendError::ConnectionFailed("refused".to_string()))
            .await;

        let err = fetch_status(&backend, &poller()).await.unwrap_err();
        assert!(matches!(err, BackendError::ConnectionFailed(_)));
    }
}
