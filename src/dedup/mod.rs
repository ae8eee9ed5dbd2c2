//! Request Deduplication Module
//!
//! Shares one execution and one result among concurrent identical operations.

mod registry;

use std::time::Duration;

use serde::Serialize;

use crate::config::Config;

pub use registry::DeduplicationRegistry;

// == Dedup Config ==
/// Limits applied to in-flight operations.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Operations older than this are cancelled
    pub timeout: Duration,
    /// Upper bound on concurrently pending keys; the oldest is evicted first
    pub max_pending: usize,
}

impl DedupConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(config.dedup_timeout_ms),
            max_pending: config.dedup_max_pending.max(1),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_pending: 100,
        }
    }
}

// == Dedup Stats ==
/// Counters describing registry activity.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DedupStats {
    /// Operations actually executed
    pub started: u64,
    /// Calls that joined an in-flight operation instead of executing
    pub deduplicated: u64,
    /// Operations aborted by cancel, eviction or cleanup
    pub cancelled: u64,
    /// Operations currently in flight
    pub pending: usize,
}
