//! Fixed-interval polling with a periodic liveness line.
//!
//! Every wait on the backend (warm-up, queue entry, free slot) uses the same
//! discipline: one query per interval, no backoff, no timeout, and an info
//! log every `liveness_every` polls so an operator can see the run is alive.

use std::time::Duration;

use tracing::info;

use crate::config::PollConfig;

/// Polling cadence shared by all waits.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    liveness_every: u64,
}

impl Poller {
    pub fn new(interval: Duration, liveness_every: u64) -> Self {
        Self {
            interval,
            liveness_every: liveness_every.max(1),
        }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms), config.liveness_every)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn liveness_every(&self) -> u64 {
        self.liveness_every
    }

    /// Start a new wait. `activity` names what is being waited for in the
    /// liveness log.
    pub fn wait(&self, activity: &'static str) -> PollWait {
        PollWait {
            poller: *self,
            activity,
            polls: 0,
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

/// State of one wait: how many intervals have elapsed so far.
#[derive(Debug)]
pub struct PollWait {
    poller: Poller,
    activity: &'static str,
    polls: u64,
}

impl PollWait {
    /// Number of intervals slept so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn elapsed(&self) -> Duration {
        let polls = u32::try_from(self.polls).unwrap_or(u32::MAX);
        self.poller.interval.saturating_mul(polls)
    }

    /// Whether the next tick emits the liveness line: on the first poll and
    /// then every `liveness_every` polls.
    pub fn liveness_due(&self) -> bool {
        self.polls % self.poller.liveness_every == 0
    }

    /// Sleep one interval, logging first when the cadence is due.
    pub async fn tick(&mut self) {
        if self.liveness_due() {
            info!(
                polls = self.polls,
                "{}\tTime elapsed: {:.0?}",
                self.activity,
                self.elapsed()
            );
        }
        tokio::time::sleep(self.poller.interval).await;
        self.polls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let poller = Poller::from_config(&PollConfig {
            interval_ms: 250,
            liveness_every: 8,
        });
        assert_eq!(poller.interval(), Duration::from_millis(250));
        assert_eq!(poller.liveness_every(), 8);
    }

    #[test]
    fn test_zero_cadence_clamped() {
        let poller = Poller::new(Duration::from_millis(1), 0);
        assert_eq!(poller.liveness_every(), 1);
    }

    #[tokio::test]
    async fn test_wait_counts_polls() {
        let poller = Poller::new(Duration::from_millis(2), 30);
        let mut wait = poller.wait("Testing");
        assert_eq!(wait.polls(), 0);
        assert_eq!(wait.elapsed(), Duration::ZERO);

        wait.tick().await;
        wait.tick().await;
        wait.tick().await;

        assert_eq!(wait.polls(), 3);
        assert_eq!(wait.elapsed(), Duration::from_millis(6));
    }

    #[test]
    fn test_liveness_cadence() {
        let poller = Poller::new(Duration::from_millis(1), 5);
        let mut wait = poller.wait("Testing");

        let mut due = Vec::new();
        for polls in 0..=12 {
            wait.polls = polls;
            if wait.liveness_due() {
                due.push(polls);
            }
        }
        assert_eq!(due, vec![0, 5, 10]);
    }

    #[test]
    fn test_liveness_every_poll_when_cadence_is_one() {
        let mut wait = Poller::new(Duration::from_millis(1), 1).wait("Testing");
        for polls in 0..4 {
            wait.polls = polls;
            assert!(wait.liveness_due());
        }
    }

    #[tokio::test]
    async fn test_tick_advances_cadence() {
        let mut wait = Poller::new(Duration::from_millis(1), 2).wait("Testing");
        assert!(wait.liveness_due());
        wait.tick().await;
        assert!(!wait.liveness_due());
        wait.tick().await;
        assert!(wait.liveness_due());
    }

    #[test]
    fn test_elapsed_saturates() {
        let mut wait = Poller::new(Duration::from_secs(u64::MAX / 2), 1).wait("Testing");
        wait.polls = 3;
        assert_eq!(wait.elapsed(), Duration::MAX);

        let mut wait = Poller::new(Duration::from_millis(1), 1).wait("Testing");
        wait.polls = u64::from(u32::MAX) + 10;
        assert_eq!(wait.elapsed(), Duration::from_millis(u64::from(u32::MAX)));
    }
}
