//! Maintenance Sweep Task
//!
//! Background task that periodically removes expired cache entries and
//! cancels deduplicated requests that have been pending for too long.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::dedup::DeduplicationRegistry;

/// Spawns a background task that sweeps the cache and the dedup registry.
///
/// The task loops forever, sleeping `interval` between runs. Each run takes
/// the cache write lock only for the duration of the sweep.
///
/// # Arguments
/// * `cache` - Shared response cache
/// * `dedup` - Registry whose stale operations are cancelled
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::new(100, Duration::from_secs(300))));
/// let dedup = DeduplicationRegistry::new(DedupConfig::default());
/// let handle = spawn_cleanup_task(cache.clone(), dedup.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<V, T>(
    cache: Arc<RwLock<CacheStore<V>>>,
    dedup: DeduplicationRegistry<T>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting maintenance sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.write().await.cleanup();
            let stale = dedup.cleanup().await;

            if expired > 0 || stale > 0 {
                info!(expired, stale, "Maintenance sweep removed entries");
            } else {
                debug!("Maintenance sweep found nothing to remove");
            }
        }
    })
}
