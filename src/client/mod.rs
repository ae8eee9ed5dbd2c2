//! Orchestrating Client Module
//!
//! Facade that routes requests through the cache, the deduplication registry
//! and the host's network executor, and wires invalidation, prefetching and
//! debouncing around them.

mod executor;
mod key;
mod orchestrator;
mod request;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::dedup::DedupStats;
use crate::prefetch::PrefetchStats;

pub use executor::NetworkExecutor;
pub use key::RequestKey;
pub use orchestrator::OrchestratingClient;
pub use request::{Method, RequestSpec};

// == Client Stats ==
/// Snapshot of every component's counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClientStats {
    pub cache: CacheStats,
    pub dedup: DedupStats,
    pub prefetch: PrefetchStats,
}
