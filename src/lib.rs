//! Prompt Orchestrator - client-side request orchestration
//!
//! Sits between UI code and the network: TTL caching with pluggable eviction,
//! coalescing of concurrent identical requests, debouncing, priority-ordered
//! background prefetching and visible-range computation for long lists.

pub mod cache;
pub mod client;
pub mod config;
pub mod debounce;
pub mod dedup;
pub mod error;
pub mod prefetch;
pub mod tasks;
pub mod telemetry;
pub mod virtualize;

pub use cache::{CacheStore, EvictionStrategy, Matcher};
pub use client::{Method, NetworkExecutor, OrchestratingClient, RequestKey, RequestSpec};
pub use config::Config;
pub use debounce::{DebounceOptions, Debounced, Debouncer};
pub use dedup::DeduplicationRegistry;
pub use error::{OrchestratorError, Result};
pub use prefetch::{BehaviorRule, EnqueueOutcome, PrefetchJob, PrefetchScheduler, Strategy};
pub use tasks::spawn_cleanup_task;
pub use virtualize::{FixedList, Grid, VariableList, VisibleRange, Virtualizer};
