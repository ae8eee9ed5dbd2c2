//! Orchestrating Client
//!
//! `request` flow: cache lookup, then a deduplicated call to the executor
//! that also writes the cache. Mutations skip the cache and run invalidation
//! hooks once they succeed.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Matcher};
use crate::client::{ClientStats, NetworkExecutor, RequestKey, RequestSpec};
use crate::config::Config;
use crate::debounce::{DebounceOptions, Debouncer};
use crate::dedup::{DedupConfig, DeduplicationRegistry};
use crate::error::{OrchestratorError, Result};
use crate::prefetch::{EnqueueOutcome, PrefetchConfig, PrefetchJob, PrefetchScheduler};
use crate::tasks::spawn_cleanup_task;

/// Cache entries to drop after a successful mutation of a matching endpoint.
struct MutationHook {
    endpoint: Regex,
    invalidates: Vec<Regex>,
}

// == Request Pipeline ==
/// The parts of the client a request touches. Prefetch jobs and debounced
/// searches hold a clone of this rather than the whole client.
#[derive(Clone)]
struct Pipeline {
    cache: Arc<RwLock<CacheStore<Value>>>,
    dedup: DeduplicationRegistry<Value>,
    executor: Arc<dyn NetworkExecutor>,
    hooks: Arc<RwLock<Vec<MutationHook>>>,
}

impl Pipeline {
    async fn fetch(&self, spec: RequestSpec) -> Result<Value> {
        let key = spec.key();

        if spec.method.is_cacheable() && !spec.bypass_cache {
            if let Some(hit) = self.cache.write().await.get(&key) {
                debug!(endpoint = %spec.endpoint, "Cache hit");
                return Ok(hit);
            }
        }

        // recorded inside the shared operation: the key stays registered
        // until the cache can answer for it
        let pipeline = self.clone();
        let request = spec.clone();
        self.dedup
            .dedupe(
                key,
                move |token| async move {
                    let value = pipeline.executor.execute(&request, token).await?;
                    pipeline.record_response(&request, &value).await;
                    Ok(value)
                },
                spec.cancel.clone(),
            )
            .await
    }

    async fn record_response(&self, spec: &RequestSpec, value: &Value) {
        if !spec.method.is_cacheable() {
            self.run_mutation_hooks(&spec.endpoint).await;
            return;
        }
        if let Err(err) = self.cache.write().await.set(spec.key(), value.clone(), spec.ttl) {
            warn!(endpoint = %spec.endpoint, error = %err, "Response not cached");
        }
    }

    async fn invalidate_endpoint(&self, pattern: &Regex) -> usize {
        let pattern = pattern.clone();
        let matcher = Matcher::predicate(move |key, _| {
            RequestKey::decode(key).is_some_and(|decoded| pattern.is_match(&decoded.endpoint))
        });
        self.cache.write().await.invalidate(&matcher)
    }

    async fn run_mutation_hooks(&self, endpoint: &str) {
        let targets: Vec<Regex> = self
            .hooks
            .read()
            .await
            .iter()
            .filter(|hook| hook.endpoint.is_match(endpoint))
            .flat_map(|hook| hook.invalidates.iter().cloned())
            .collect();

        let mut removed = 0;
        for target in &targets {
            removed += self.invalidate_endpoint(target).await;
        }
        if !targets.is_empty() {
            debug!(endpoint, removed, "Mutation invalidated cached responses");
        }
    }
}

// == Orchestrating Client ==
/// Entry point for UI code. Owns its cache, registry and scheduler; nothing
/// is shared between client instances.
///
/// Cloning yields another handle to the same client.
#[derive(Clone)]
pub struct OrchestratingClient {
    pipeline: Pipeline,
    scheduler: PrefetchScheduler,
    config: Config,
    cleanup: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OrchestratingClient {
    // == Constructor ==
    /// Builds a client around `executor`. Background work does not run until
    /// `start` is called.
    pub fn new(config: Config, executor: Arc<dyn NetworkExecutor>) -> Result<Self> {
        config.validate()?;

        let pipeline = Pipeline {
            cache: Arc::new(RwLock::new(CacheStore::from_config(&config))),
            dedup: DeduplicationRegistry::new(DedupConfig::from_config(&config)),
            executor,
            hooks: Arc::new(RwLock::new(Vec::new())),
        };

        info!(
            cache_max_size = config.cache_max_size,
            eviction = %config.eviction_strategy,
            "Orchestrating client created"
        );

        Ok(Self {
            pipeline,
            scheduler: PrefetchScheduler::new(PrefetchConfig::from_config(&config)),
            config,
            cleanup: Arc::new(Mutex::new(None)),
        })
    }

    // == Request ==
    /// Resolves `spec` from the cache or the network.
    ///
    /// GET responses are served from and stored in the cache. Concurrent
    /// identical requests share one executor call and one result. If the
    /// spec's cancellation token fires, the shared call is aborted for every
    /// caller waiting on it.
    pub async fn request(&self, spec: RequestSpec) -> Result<Value> {
        self.pipeline.fetch(spec).await
    }

    // == Invalidation ==
    pub async fn invalidate(&self, matcher: &Matcher<Value>) -> usize {
        self.pipeline.cache.write().await.invalidate(matcher)
    }

    /// Drops cached responses whose endpoint matches `pattern`.
    ///
    /// The pattern is applied to the decoded endpoint, not to the raw key.
    pub async fn invalidate_endpoint(&self, pattern: &Regex) -> usize {
        self.pipeline.invalidate_endpoint(pattern).await
    }

    /// After a successful mutation of an endpoint matching `endpoint_pattern`,
    /// cached responses for every endpoint matching one of `invalidates` are
    /// dropped.
    pub async fn on_mutation(&self, endpoint_pattern: Regex, invalidates: Vec<Regex>) {
        self.pipeline.hooks.write().await.push(MutationHook {
            endpoint: endpoint_pattern,
            invalidates,
        });
    }

    // == Prefetch ==
    /// Queues a background fetch that warms the cache for `spec`.
    pub async fn prefetch(&self, spec: RequestSpec, priority: i32) -> EnqueueOutcome {
        let job = self.prefetch_job(spec, priority);
        self.scheduler.enqueue(job).await
    }

    /// Builds a job that runs `spec` through the normal request path.
    ///
    /// Useful as the output of a prefetch `Strategy` or `BehaviorRule`. The
    /// job id is the request key, so repeated prefetches of one resource
    /// collapse. Abandoning the job never cancels a user's identical request.
    pub fn prefetch_job(&self, spec: RequestSpec, priority: i32) -> PrefetchJob {
        let pipeline = self.pipeline.clone();
        let id = spec.key();
        let kind = spec.endpoint.clone();
        let spec = RequestSpec {
            cancel: None,
            ..spec
        };

        PrefetchJob::new(id, kind, priority, move |_token| {
            let pipeline = pipeline.clone();
            let spec = spec.clone();
            async move {
                match pipeline.fetch(spec).await {
                    Ok(_) => Ok(()),
                    Err(OrchestratorError::Cancelled) => Err(OrchestratorError::Cancelled),
                    Err(err) => Err(OrchestratorError::PrefetchFailure(err.to_string())),
                }
            }
        })
    }

    pub fn scheduler(&self) -> &PrefetchScheduler {
        &self.scheduler
    }

    // == Debounced ==
    /// Returns a debouncer that sends only the last request of each burst,
    /// e.g. for search-as-you-type.
    pub fn debounced(
        &self,
        wait: Duration,
        options: DebounceOptions,
    ) -> Debouncer<RequestSpec, Value, OrchestratorError> {
        let pipeline = self.pipeline.clone();
        Debouncer::new(
            move |spec: RequestSpec| {
                let pipeline = pipeline.clone();
                async move { pipeline.fetch(spec).await }
            },
            wait,
            options,
        )
    }

    // == Cancel ==
    /// Cancels the in-flight request or prefetch job identified by `key`.
    pub async fn cancel(&self, key: &str) -> bool {
        let request = self.pipeline.dedup.cancel(key).await;
        let prefetch = self.scheduler.cancel(key).await;
        request || prefetch
    }

    /// Cancels every in-flight request.
    pub async fn cancel_all(&self) -> usize {
        let cancelled = self.pipeline.dedup.cancel_all().await;
        if cancelled > 0 {
            warn!(cancelled, "Cancelled all in-flight requests");
        }
        cancelled
    }

    // == Stats ==
    pub async fn stats(&self) -> ClientStats {
        ClientStats {
            cache: self.pipeline.cache.read().await.stats(),
            dedup: self.pipeline.dedup.stats().await,
            prefetch: self.scheduler.stats().await,
        }
    }

    // == Lifecycle ==
    /// Launches the maintenance sweep and the prefetch loop.
    pub async fn start(&self) {
        let mut cleanup = self.cleanup.lock().await;
        if cleanup.is_none() {
            *cleanup = Some(spawn_cleanup_task(
                Arc::clone(&self.pipeline.cache),
                self.pipeline.dedup.clone(),
                self.config.cleanup_interval(),
            ));
        }
        self.scheduler.start().await;
        info!("Orchestrating client started");
    }

    /// Stops background work and cancels everything in flight.
    ///
    /// Cached responses are kept.
    pub async fn destroy(&self) {
        if let Some(handle) = self.cleanup.lock().await.take() {
            handle.abort();
        }
        self.scheduler.destroy().await;
        let cancelled = self.pipeline.dedup.cancel_all().await;
        info!(cancelled, "Orchestrating client destroyed");
    }
}
