//! Deduplication Registry
//!
//! Coalesces concurrent operations that share a request signature so the
//! underlying work runs once and every caller receives the same result.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dedup::{DedupConfig, DedupStats};
use crate::error::{OrchestratorError, Result};

// == Pending Operation ==
/// One in-flight operation and the callers waiting on it.
struct PendingOperation<T> {
    /// Distinguishes successive operations registered under the same key
    id: u64,
    /// Shared by every subscriber; cancelling it aborts the work for all
    token: CancellationToken,
    started_at: Instant,
    /// Settled in subscription order
    subscribers: Vec<oneshot::Sender<Result<T>>>,
}

impl<T: Clone> PendingOperation<T> {
    /// Aborts the work and settles every subscriber with `Cancelled`.
    fn abort(self) {
        self.token.cancel();
        for subscriber in self.subscribers {
            let _ = subscriber.send(Err(OrchestratorError::Cancelled));
        }
    }
}

struct RegistryState<T> {
    pending: HashMap<String, PendingOperation<T>>,
    stats: DedupStats,
    next_id: u64,
}

impl<T: Clone> RegistryState<T> {
    fn cancel_key(&mut self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some(op) => {
                op.abort();
                self.stats.cancelled += 1;
                true
            }
            None => false,
        }
    }

    fn oldest_key(&self) -> Option<String> {
        self.pending
            .iter()
            .min_by_key(|(_, op)| (op.started_at, op.id))
            .map(|(key, _)| key.clone())
    }
}

// == Deduplication Registry ==
/// Tracks in-flight operations keyed by request signature.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct DeduplicationRegistry<T> {
    state: Arc<Mutex<RegistryState<T>>>,
    config: DedupConfig,
}

impl<T> Clone for DeduplicationRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config.clone(),
        }
    }
}

impl<T> DeduplicationRegistry<T>
where
    T: Clone + Send + 'static,
{
    // == Constructor ==
    pub fn new(config: DedupConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                pending: HashMap::new(),
                stats: DedupStats::default(),
                next_id: 0,
            })),
            config,
        }
    }

    // == Dedupe ==
    /// Runs `operation` for `key` unless an identical operation is in flight.
    ///
    /// If one is pending, the caller subscribes to it and `operation` is
    /// dropped without being invoked. Otherwise the operation is spawned once
    /// with a fresh cancellation token. On settlement every subscriber receives
    /// the same value or error, then the key is released.
    ///
    /// If `external` fires, the shared token is cancelled: the operation is
    /// aborted for every subscriber, not just this caller.
    ///
    /// # Arguments
    /// * `key` - Request signature
    /// * `operation` - Produces the work, given the shared cancellation token
    /// * `external` - Optional caller-owned cancellation token
    pub async fn dedupe<F, Fut>(
        &self,
        key: impl Into<String>,
        operation: F,
        external: Option<CancellationToken>,
    ) -> Result<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = key.into();
        let (tx, rx) = oneshot::channel();

        let (token, id) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;

            if let Some(op) = state.pending.get_mut(&key) {
                op.subscribers.push(tx);
                state.stats.deduplicated += 1;
                debug!(key = %key, subscribers = op.subscribers.len(), "Joined pending operation");
                if let Some(external) = external {
                    link_external(external, op.token.clone());
                }
                drop(guard);
                return receive(rx).await;
            }

            while state.pending.len() >= self.config.max_pending {
                let Some(oldest) = state.oldest_key() else {
                    break;
                };
                warn!(key = %oldest, max_pending = self.config.max_pending, "Evicting oldest pending operation");
                state.cancel_key(&oldest);
            }

            let id = state.next_id;
            state.next_id += 1;
            let token = CancellationToken::new();
            state.pending.insert(
                key.clone(),
                PendingOperation {
                    id,
                    token: token.clone(),
                    started_at: Instant::now(),
                    subscribers: vec![tx],
                },
            );
            state.stats.started += 1;
            (token, id)
        };

        if let Some(external) = external {
            link_external(external, token.clone());
        }

        debug!(key = %key, "Starting operation");
        let state = Arc::clone(&self.state);
        let timeout = self.config.timeout;
        tokio::spawn(async move {
            // panics raised while building the future are caught too
            let work = {
                let token = token.clone();
                AssertUnwindSafe(async move { operation(token).await }).catch_unwind()
            };
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(OrchestratorError::Cancelled),
                _ = tokio::time::sleep(timeout) => {
                    warn!(key = %key, ?timeout, "Pending operation timed out");
                    token.cancel();
                    Err(OrchestratorError::Cancelled)
                }
                result = work => result.unwrap_or_else(|_| {
                    Err(OrchestratorError::NetworkFailure("operation panicked".to_string()))
                }),
            };
            settle(&state, &key, id, outcome).await;
            // releases external-token watchers
            token.cancel();
        });

        receive(rx).await
    }

    // == Cancel ==
    /// Aborts and removes the pending operation for `key` without waiting for
    /// it to settle. Its subscribers receive `Cancelled`.
    pub async fn cancel(&self, key: &str) -> bool {
        let cancelled = self.state.lock().await.cancel_key(key);
        if cancelled {
            debug!(key, "Cancelled pending operation");
        }
        cancelled
    }

    // == Cancel All ==
    pub async fn cancel_all(&self) -> usize {
        self.cancel_matching(|_| true).await
    }

    // == Cancel Matching ==
    /// Cancels every pending operation whose key satisfies `predicate`.
    pub async fn cancel_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let mut state = self.state.lock().await;
        let keys: Vec<String> = state
            .pending
            .keys()
            .filter(|key| predicate(key.as_str()))
            .cloned()
            .collect();

        for key in &keys {
            state.cancel_key(key);
        }
        keys.len()
    }

    // == Cleanup ==
    /// Cancels operations older than the configured timeout, then evicts the
    /// oldest until no more than `max_pending` remain.
    ///
    /// Returns the number of operations removed.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let stale: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, op)| now.saturating_duration_since(op.started_at) > self.config.timeout)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in &stale {
            if state.cancel_key(key) {
                removed += 1;
            }
        }

        while state.pending.len() > self.config.max_pending {
            let Some(oldest) = state.oldest_key() else {
                break;
            };
            state.cancel_key(&oldest);
            removed += 1;
        }

        if removed > 0 {
            warn!(removed, "Cleaned up stale pending operations");
        }
        removed
    }

    pub async fn is_pending(&self, key: &str) -> bool {
        self.state.lock().await.pending.contains_key(key)
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn stats(&self) -> DedupStats {
        let state = self.state.lock().await;
        DedupStats {
            pending: state.pending.len(),
            ..state.stats.clone()
        }
    }
}

/// Delivers the outcome to every subscriber, unless the operation was already
/// cancelled and replaced.
async fn settle<T: Clone>(
    state: &Mutex<RegistryState<T>>,
    key: &str,
    id: u64,
    outcome: Result<T>,
) {
    let subscribers = {
        let mut state = state.lock().await;
        let is_current = state.pending.get(key).map(|op| op.id) == Some(id);
        if !is_current {
            return;
        }
        state
            .pending
            .remove(key)
            .map(|op| op.subscribers)
            .unwrap_or_default()
    };

    debug!(key, subscribers = subscribers.len(), ok = outcome.is_ok(), "Operation settled");
    for subscriber in subscribers {
        let _ = subscriber.send(outcome.clone());
    }
}

async fn receive<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
    rx.await.unwrap_or(Err(OrchestratorError::Cancelled))
}

/// Cancels `shared` when `external` fires; stops watching once `shared` is done.
fn link_external(external: CancellationToken, shared: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = external.cancelled() => shared.cancel(),
            _ = shared.cancelled() => {}
        }
    });
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn registry() -> DeduplicationRegistry<String> {
        DeduplicationRegistry::new(DedupConfig::default())
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        result: Result<String>,
        delay: Duration,
    ) -> impl FnOnce(CancellationToken) -> futures::future::BoxFuture<'static, Result<String>> {
        let calls = Arc::clone(calls);
        move |_token| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(delay).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_invoke_once() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_millis(50);

        let (a, b) = tokio::join!(
            registry.dedupe("k", counted(&calls, Ok("v".to_string()), delay), None),
            registry.dedupe("k", counted(&calls, Ok("other".to_string()), delay), None),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), "v");
        assert_eq!(b.unwrap(), "v");
        assert_eq!(registry.pending_count().await, 0);

        let stats = registry.stats().await;
        assert_eq!(stats.started, 1);
        assert_eq!(stats.deduplicated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_fans_out_identically() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = Err(OrchestratorError::NetworkFailure("boom".to_string()));

        let (a, b) = tokio::join!(
            registry.dedupe("k", counted(&calls, failure, Duration::from_millis(5)), None),
            registry.dedupe("k", counted(&calls, Ok("x".to_string()), Duration::ZERO), None),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let (a, b) = (a.unwrap_err(), b.unwrap_err());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Network failure: boom");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_run_again() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let result = registry
                .dedupe("k", counted(&calls, Ok("v".to_string()), Duration::ZERO), None)
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_settles_all_subscribers() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = Duration::from_secs(5);

        let first = tokio::spawn({
            let registry = registry.clone();
            let op = counted(&calls, Ok("v".to_string()), slow);
            async move { registry.dedupe("k", op, None).await }
        });
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let registry = registry.clone();
            let op = counted(&calls, Ok("v".to_string()), slow);
            async move { registry.dedupe("k", op, None).await }
        });
        tokio::task::yield_now().await;

        assert!(registry.is_pending("k").await);
        assert!(registry.cancel("k").await);
        assert!(!registry.cancel("k").await);

        assert_eq!(first.await.unwrap(), Err(OrchestratorError::Cancelled));
        assert_eq!(second.await.unwrap(), Err(OrchestratorError::Cancelled));
        assert!(!registry.is_pending("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancel_aborts_for_everyone() {
        let registry = registry();
        let external = CancellationToken::new();
        let observed = CancellationToken::new();

        let operation = {
            let observed = observed.clone();
            move |token: CancellationToken| async move {
                token.cancelled().await;
                observed.cancel();
                Ok("never".to_string())
            }
        };

        let canceller = {
            let external = external.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                external.cancel();
            }
        };

        let (a, b, ()) = tokio::join!(
            registry.dedupe("k", operation, Some(external)),
            registry.dedupe("k", |_| async { Ok("unused".to_string()) }, None),
            canceller,
        );

        assert!(a.unwrap_err().is_cancelled());
        assert!(b.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_cancellation() {
        let registry = DeduplicationRegistry::new(DedupConfig {
            timeout: Duration::from_millis(100),
            max_pending: 10,
        });

        let result: Result<String> = registry
            .dedupe(
                "slow",
                |_| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok("late".to_string())
                },
                None,
            )
            .await;

        assert_eq!(result, Err(OrchestratorError::Cancelled));
        assert_eq!(registry.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_pending_evicts_oldest() {
        let registry = DeduplicationRegistry::new(DedupConfig {
            timeout: Duration::from_secs(30),
            max_pending: 2,
        });

        let mut handles = Vec::new();
        for key in ["a", "b", "c"] {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .dedupe(
                        key,
                        move |_| async move {
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            Ok(key.to_string())
                        },
                        None,
                    )
                    .await
            }));
            tokio::time::advance(Duration::from_millis(1)).await;
        }

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results[0], Err(OrchestratorError::Cancelled));
        assert_eq!(results[1], Ok("b".to_string()));
        assert_eq!(results[2], Ok("c".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_matching_and_cleanup() {
        let registry = DeduplicationRegistry::new(DedupConfig {
            timeout: Duration::from_secs(30),
            max_pending: 10,
        });

        let mut handles = Vec::new();
        for key in ["prompts/1", "prompts/2", "users/1"] {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .dedupe(key, |token| async move {
                        token.cancelled().await;
                        Ok(String::new())
                    }, None)
                    .await
            }));
        }
        tokio::task::yield_now().await;
        while registry.pending_count().await < 3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(registry.cancel_matching(|k| k.starts_with("prompts/")).await, 2);
        assert_eq!(registry.cleanup().await, 0);
        assert_eq!(registry.cancel_all().await, 1);

        for handle in handles {
            assert!(handle.await.unwrap().unwrap_err().is_cancelled());
        }
        assert_eq!(registry.stats().await.cancelled, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_operation_settles_as_failure() {
        let registry = registry();

        let result = registry
            .dedupe(
                "k",
                |_| async {
                    if true {
                        panic!("executor bug");
                    }
                    Ok(String::new())
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(OrchestratorError::NetworkFailure(_))));
        assert_eq!(registry.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_that_panics_when_called_still_settles() {
        let registry = registry();

        fn explode(_token: CancellationToken) -> futures::future::Ready<Result<String>> {
            panic!("failed to build request");
        }

        let (a, b) = tokio::join!(
            registry.dedupe("k", explode, None),
            registry.dedupe("k", |_| async { Ok("unused".to_string()) }, None),
        );

        assert!(matches!(a, Err(OrchestratorError::NetworkFailure(_))));
        assert_eq!(a, b);
        assert_eq!(registry.pending_count().await, 0);
    }
}
