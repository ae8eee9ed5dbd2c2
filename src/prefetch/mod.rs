//! Prefetch Module
//!
//! Speculative background fetching: a priority queue of jobs drained by a
//! concurrency-bounded tick loop, fed by declarative strategies and
//! user-behavior counters. Prefetching is advisory, so job failures are
//! logged and counted but never surfaced to callers.

mod job;
mod scheduler;
mod strategy;

use std::time::Duration;

use serde::Serialize;

use crate::config::Config;

pub use job::PrefetchJob;
pub use scheduler::PrefetchScheduler;
pub use strategy::{BehaviorRule, Strategy};

// == Prefetch Config ==
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Jobs allowed to run at once
    pub max_concurrent: usize,
    /// Tick interval of the processing loop
    pub delay: Duration,
    /// A job id that ran within this window is not fetched again
    pub max_age: Duration,
    /// Running jobs are cancelled after this long
    pub job_timeout: Duration,
}

impl PrefetchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.prefetch_max_concurrent.max(1),
            delay: Duration::from_millis(config.prefetch_delay_ms.max(1)),
            max_age: Duration::from_millis(config.prefetch_max_age_ms),
            job_timeout: Duration::from_millis(config.prefetch_job_timeout_ms),
        }
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            delay: Duration::from_millis(100),
            max_age: Duration::from_secs(300),
            job_timeout: Duration::from_secs(10),
        }
    }
}

// == Enqueue Outcome ==
/// What `enqueue` did with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnqueueOutcome {
    /// Added to the queue
    Queued,
    /// Already queued at a lower priority; priority was raised in place
    PriorityRaised,
    /// Already queued at the same or a higher priority
    AlreadyQueued,
    /// Ran within the max prefetch age
    RecentlyFetched,
    /// Currently executing
    InFlight,
}

impl EnqueueOutcome {
    /// True when the queue changed.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued | EnqueueOutcome::PriorityRaised)
    }
}

// == Prefetch Stats ==
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PrefetchStats {
    pub queue_len: usize,
    pub executing: usize,
    pub history_len: usize,
    pub strategies: usize,
    /// Jobs that finished successfully
    pub completed: u64,
    /// Jobs that returned an error, panicked or timed out
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_values() {
        let config = Config {
            prefetch_max_concurrent: 0,
            prefetch_delay_ms: 250,
            ..Config::default()
        };
        let prefetch = PrefetchConfig::from_config(&config);

        assert_eq!(prefetch.max_concurrent, 1);
        assert_eq!(prefetch.delay, Duration::from_millis(250));
        assert_eq!(prefetch.max_age, Duration::from_secs(300));
        assert_eq!(prefetch.job_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_outcome_is_scheduled() {
        assert!(EnqueueOutcome::Queued.is_scheduled());
        assert!(EnqueueOutcome::PriorityRaised.is_scheduled());
        assert!(!EnqueueOutcome::InFlight.is_scheduled());
        assert!(!EnqueueOutcome::RecentlyFetched.is_scheduled());
    }
}
