//! Configuration Module
//!
//! Handles loading and managing orchestrator configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionStrategy;
use crate::error::{OrchestratorError, Result};

/// Orchestrator configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the response cache can hold
    pub cache_max_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub cache_default_ttl_ms: u64,
    /// Background cleanup task interval in milliseconds
    pub cleanup_interval_ms: u64,
    /// Which entry to drop when the cache is full
    pub eviction_strategy: EvictionStrategy,
    /// Age in milliseconds after which a pending request is cancelled
    pub dedup_timeout_ms: u64,
    /// Maximum number of in-flight deduplicated requests
    pub dedup_max_pending: usize,
    /// Maximum number of prefetch jobs running at once
    pub prefetch_max_concurrent: usize,
    /// Prefetch scheduler tick interval in milliseconds
    pub prefetch_delay_ms: u64,
    /// Window in milliseconds in which a prefetched id is not fetched again
    pub prefetch_max_age_ms: u64,
    /// Per-job prefetch timeout in milliseconds
    pub prefetch_job_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 100)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL (default: 300000)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Cleanup frequency (default: 60000)
    /// - `CACHE_EVICTION_STRATEGY` - `lru`, `fifo` or `ttl` (default: lru)
    /// - `DEDUP_TIMEOUT_MS` - Pending request timeout (default: 30000)
    /// - `DEDUP_MAX_PENDING` - Pending request bound (default: 100)
    /// - `PREFETCH_MAX_CONCURRENT` - Prefetch concurrency (default: 3)
    /// - `PREFETCH_DELAY_MS` - Prefetch tick interval (default: 100)
    /// - `PREFETCH_MAX_AGE_MS` - Re-prefetch suppression window (default: 300000)
    /// - `PREFETCH_JOB_TIMEOUT_MS` - Prefetch job timeout (default: 10000)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_max_size: env_or("CACHE_MAX_SIZE", defaults.cache_max_size),
            cache_default_ttl_ms: env_or("CACHE_DEFAULT_TTL_MS", defaults.cache_default_ttl_ms),
            cleanup_interval_ms: env_or("CACHE_CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            eviction_strategy: env_or("CACHE_EVICTION_STRATEGY", defaults.eviction_strategy),
            dedup_timeout_ms: env_or("DEDUP_TIMEOUT_MS", defaults.dedup_timeout_ms),
            dedup_max_pending: env_or("DEDUP_MAX_PENDING", defaults.dedup_max_pending),
            prefetch_max_concurrent: env_or(
                "PREFETCH_MAX_CONCURRENT",
                defaults.prefetch_max_concurrent,
            ),
            prefetch_delay_ms: env_or("PREFETCH_DELAY_MS", defaults.prefetch_delay_ms),
            prefetch_max_age_ms: env_or("PREFETCH_MAX_AGE_MS", defaults.prefetch_max_age_ms),
            prefetch_job_timeout_ms: env_or(
                "PREFETCH_JOB_TIMEOUT_MS",
                defaults.prefetch_job_timeout_ms,
            ),
        }
    }

    // == Validate ==
    /// Rejects values that would make a component unusable.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool); 6] = [
            ("cache_max_size", self.cache_max_size == 0),
            ("cleanup_interval_ms", self.cleanup_interval_ms == 0),
            ("dedup_max_pending", self.dedup_max_pending == 0),
            ("prefetch_max_concurrent", self.prefetch_max_concurrent == 0),
            ("prefetch_delay_ms", self.prefetch_delay_ms == 0),
            ("prefetch_job_timeout_ms", self.prefetch_job_timeout_ms == 0),
        ];

        match checks.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(OrchestratorError::InvalidConfig(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_default_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_size: 100,
            cache_default_ttl_ms: 300_000,
            cleanup_interval_ms: 60_000,
            eviction_strategy: EvictionStrategy::Lru,
            dedup_timeout_ms: 30_000,
            dedup_max_pending: 100,
            prefetch_max_concurrent: 3,
            prefetch_delay_ms: 100,
            prefetch_max_age_ms: 300_000,
            prefetch_job_timeout_ms: 10_000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
