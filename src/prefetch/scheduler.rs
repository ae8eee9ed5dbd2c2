//! Prefetch Scheduler
//!
//! Priority queue plus worker loop. Jobs are popped highest priority first
//! (enqueue order breaks ties) while fewer than `max_concurrent` are running.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, Result};
use crate::prefetch::{
    BehaviorRule, EnqueueOutcome, PrefetchConfig, PrefetchJob, PrefetchStats, Strategy,
};

// == Heap Entry ==
/// Heap slot pointing at a queued job.
///
/// Raising a job's priority pushes a second entry; the older one becomes stale
/// and is skipped when popped because its ticket no longer matches.
#[derive(Debug, PartialEq, Eq)]
struct HeapEntry {
    priority: i32,
    seq: u64,
    ticket: u64,
    id: String,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher priority first, then the earlier enqueue
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
            .then_with(|| other.ticket.cmp(&self.ticket))
    }
}

struct QueuedJob {
    job: PrefetchJob,
    seq: u64,
    ticket: u64,
    enqueued_at: Instant,
}

struct RunningJob {
    run_id: u64,
    token: CancellationToken,
}

struct SchedulerState {
    heap: BinaryHeap<HeapEntry>,
    queued: HashMap<String, QueuedJob>,
    executing: HashMap<String, RunningJob>,
    /// Job id -> when it last finished
    history: HashMap<String, Instant>,
    strategies: IndexMap<String, Strategy>,
    rules: Vec<BehaviorRule>,
    /// (action, canonical context) -> occurrences
    behavior: HashMap<(String, String), u32>,
    /// Parent of every job token; replaced on destroy
    root: CancellationToken,
    ticker: Option<JoinHandle<()>>,
    next_seq: u64,
    completed: u64,
    failed: u64,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            queued: HashMap::new(),
            executing: HashMap::new(),
            history: HashMap::new(),
            strategies: IndexMap::new(),
            rules: Vec::new(),
            behavior: HashMap::new(),
            root: CancellationToken::new(),
            ticker: None,
            next_seq: 0,
            completed: 0,
            failed: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn enqueue(&mut self, job: PrefetchJob, max_age: time::Duration) -> EnqueueOutcome {
        let now = Instant::now();
        if self.executing.contains_key(&job.id) {
            return EnqueueOutcome::InFlight;
        }
        if let Some(last_run) = self.history.get(&job.id) {
            if now.duration_since(*last_run) < max_age {
                return EnqueueOutcome::RecentlyFetched;
            }
        }

        let ticket = self.next_seq();
        if let Some(queued) = self.queued.get_mut(&job.id) {
            if job.priority <= queued.job.priority {
                return EnqueueOutcome::AlreadyQueued;
            }
            queued.job.priority = job.priority;
            queued.ticket = ticket;
            self.heap.push(HeapEntry {
                priority: job.priority,
                seq: queued.seq,
                ticket,
                id: job.id,
            });
            return EnqueueOutcome::PriorityRaised;
        }

        self.heap.push(HeapEntry {
            priority: job.priority,
            seq: ticket,
            ticket,
            id: job.id.clone(),
        });
        self.queued.insert(
            job.id.clone(),
            QueuedJob {
                job,
                seq: ticket,
                ticket,
                enqueued_at: now,
            },
        );
        EnqueueOutcome::Queued
    }

    /// Pops the highest-priority live job, discarding stale heap entries.
    fn pop_next(&mut self) -> Option<QueuedJob> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .queued
                .get(&entry.id)
                .is_some_and(|queued| queued.ticket == entry.ticket);
            if live {
                return self.queued.remove(&entry.id);
            }
        }
        None
    }

    fn prune_history(&mut self, max_age: time::Duration) -> usize {
        let now = Instant::now();
        let before = self.history.len();
        self.history
            .retain(|_, finished_at| now.duration_since(*finished_at) < max_age);
        before - self.history.len()
    }

    fn behavior_count(&self, action: &str, context_key: &str) -> u32 {
        self.behavior
            .get(&(action.to_string(), context_key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            queue_len: self.queued.len(),
            executing: self.executing.len(),
            history_len: self.history.len(),
            strategies: self.strategies.len(),
            completed: self.completed,
            failed: self.failed,
        }
    }
}

/// Stable serialization of a behavior context; object keys come out sorted.
fn context_key(context: &Value) -> String {
    serde_json::to_string(context).unwrap_or_default()
}

// == Prefetch Scheduler ==
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct PrefetchScheduler {
    state: Arc<Mutex<SchedulerState>>,
    config: PrefetchConfig,
}

impl PrefetchScheduler {
    // == Constructor ==
    pub fn new(config: PrefetchConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::new())),
            config,
        }
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    // == Enqueue ==
    /// Queues `job` unless it is running, ran within `max_age`, or is already
    /// queued. Re-adding a queued id raises its priority to the larger value.
    pub async fn enqueue(&self, job: PrefetchJob) -> EnqueueOutcome {
        let id = job.id.clone();
        let priority = job.priority;
        let outcome = self.state.lock().await.enqueue(job, self.config.max_age);
        debug!(job_id = %id, priority, ?outcome, "Prefetch enqueue");
        outcome
    }

    // == Strategies ==
    /// Registers `strategy`, replacing any strategy with the same name.
    pub async fn add_strategy(&self, strategy: Strategy) {
        let mut state = self.state.lock().await;
        debug!(strategy = %strategy.name, priority = strategy.priority, "Registering prefetch strategy");
        state.strategies.insert(strategy.name.clone(), strategy);
    }

    pub async fn remove_strategy(&self, name: &str) -> bool {
        self.state
            .lock()
            .await
            .strategies
            .shift_remove(name)
            .is_some()
    }

    /// Registered strategy names, highest priority first.
    pub async fn strategy_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut strategies: Vec<&Strategy> = state.strategies.values().collect();
        strategies.sort_by(|a, b| b.priority.cmp(&a.priority));
        strategies.into_iter().map(|s| s.name.clone()).collect()
    }

    // == Prefetch For Context ==
    /// Runs every strategy whose condition holds for `context`, highest
    /// priority first, and enqueues the jobs they produce.
    ///
    /// Returns the number of jobs that changed the queue.
    pub async fn prefetch_for_context(&self, context: &Value) -> usize {
        let mut state = self.state.lock().await;

        let mut matching: Vec<Strategy> = state
            .strategies
            .values()
            .filter(|strategy| strategy.applies_to(context))
            .cloned()
            .collect();
        // stable: equal priorities keep registration order
        matching.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut scheduled = 0;
        for strategy in matching {
            for job in strategy.jobs_for(context) {
                let job = job.with_context(context.clone());
                if state.enqueue(job, self.config.max_age).is_scheduled() {
                    scheduled += 1;
                }
            }
            debug!(strategy = %strategy.name, "Prefetch strategy matched");
        }
        scheduled
    }

    // == Behavior ==
    pub async fn add_rule(&self, rule: BehaviorRule) {
        self.state.lock().await.rules.push(rule);
    }

    /// Counts one occurrence of `action` in `context` and fires any behavior
    /// rule that now applies. Returns the updated count.
    pub async fn record_user_behavior(&self, action: &str, context: &Value) -> u32 {
        let key = context_key(context);
        let mut state = self.state.lock().await;

        let count = {
            let counter = state
                .behavior
                .entry((action.to_string(), key.clone()))
                .or_insert(0);
            *counter = counter.saturating_add(1);
            *counter
        };

        let firing: Vec<BehaviorRule> = state
            .rules
            .iter()
            .filter(|rule| rule.action == action)
            .filter(|rule| {
                let unless = rule
                    .unless_action
                    .as_deref()
                    .map_or(0, |unless| state.behavior_count(unless, &key));
                rule.fires(count, unless)
            })
            .cloned()
            .collect();

        for rule in firing {
            for job in rule.jobs_for(context) {
                let outcome = state.enqueue(job.with_context(context.clone()), self.config.max_age);
                debug!(action, count, ?outcome, "Behavior rule fired");
            }
        }
        count
    }

    pub async fn behavior_count(&self, action: &str, context: &Value) -> u32 {
        self.state
            .lock()
            .await
            .behavior_count(action, &context_key(context))
    }

    // == Process Queue ==
    /// Starts queued jobs until `max_concurrent` are running.
    ///
    /// Returns the number of jobs started.
    pub async fn process_queue(&self) -> usize {
        let mut state = self.state.lock().await;
        let pruned = state.prune_history(self.config.max_age);
        if pruned > 0 {
            debug!(pruned, "Pruned prefetch history");
        }

        let mut started = 0;
        while state.executing.len() < self.config.max_concurrent {
            let Some(queued) = state.pop_next() else {
                break;
            };

            let run_id = state.next_seq();
            let token = state.root.child_token();
            state.executing.insert(
                queued.job.id.clone(),
                RunningJob {
                    run_id,
                    token: token.clone(),
                },
            );
            debug!(
                job_id = %queued.job.id,
                kind = %queued.job.kind,
                priority = queued.job.priority,
                waited_ms = queued.enqueued_at.elapsed().as_millis() as u64,
                "Starting prefetch job"
            );
            self.spawn_job(queued.job, run_id, token);
            started += 1;
        }
        started
    }

    fn spawn_job(&self, job: PrefetchJob, run_id: u64, token: CancellationToken) {
        let state = Arc::clone(&self.state);
        let timeout = self.config.job_timeout;

        tokio::spawn(async move {
            let work = AssertUnwindSafe(job.run(token.clone())).catch_unwind();
            let outcome: Result<()> = tokio::select! {
                biased;
                _ = token.cancelled() => Err(OrchestratorError::Cancelled),
                _ = time::sleep(timeout) => {
                    token.cancel();
                    Err(OrchestratorError::PrefetchFailure(format!(
                        "timed out after {}ms",
                        timeout.as_millis()
                    )))
                }
                result = work => result.unwrap_or_else(|_| {
                    Err(OrchestratorError::PrefetchFailure("job panicked".to_string()))
                }),
            };

            let mut state = state.lock().await;
            let current = state
                .executing
                .get(&job.id)
                .is_some_and(|running| running.run_id == run_id);
            if current {
                state.executing.remove(&job.id);
            }

            match outcome {
                Ok(()) => {
                    state.completed += 1;
                    state.history.insert(job.id.clone(), Instant::now());
                    debug!(job_id = %job.id, "Prefetch job completed");
                }
                Err(OrchestratorError::Cancelled) => {
                    debug!(job_id = %job.id, "Prefetch job cancelled");
                }
                Err(err) => {
                    state.failed += 1;
                    state.history.insert(job.id.clone(), Instant::now());
                    warn!(job_id = %job.id, kind = %job.kind, error = %err, "Prefetch job failed");
                }
            }
        });
    }

    // == Cancel ==
    /// Drops a queued job or cancels a running one.
    pub async fn cancel(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.queued.remove(id).is_some() {
            debug!(job_id = %id, "Removed queued prefetch job");
            return true;
        }
        match state.executing.get(id) {
            Some(running) => {
                running.token.cancel();
                debug!(job_id = %id, "Cancelled running prefetch job");
                true
            }
            None => false,
        }
    }

    // == Lifecycle ==
    /// Spawns the tick loop. Returns false if it is already running.
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.ticker.is_some() {
            return false;
        }

        let scheduler = self.clone();
        let shutdown = state.root.clone();
        let delay = self.config.delay;

        state.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        scheduler.process_queue().await;
                    }
                }
            }
            debug!("Prefetch loop stopped");
        }));

        info!(
            max_concurrent = self.config.max_concurrent,
            delay_ms = delay.as_millis() as u64,
            "Prefetch scheduler started"
        );
        true
    }

    /// Stops the loop, cancels running jobs and clears the queue.
    ///
    /// Strategies, rules and counters are kept; `start` may be called again.
    pub async fn destroy(&self) {
        let mut state = self.state.lock().await;
        state.root.cancel();
        state.root = CancellationToken::new();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }

        let dropped = state.queued.len();
        let cancelled = state.executing.len();
        state.heap.clear();
        state.queued.clear();
        state.executing.clear();
        info!(dropped, cancelled, "Prefetch scheduler destroyed");
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.ticker.is_some()
    }

    pub async fn stats(&self) -> PrefetchStats {
        self.state.lock().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn job(id: &str, priority: i32) -> PrefetchJob {
        PrefetchJob::new(id, "test", priority, |_| async { Ok(()) })
    }

    fn pending_job(id: &str) -> PrefetchJob {
        PrefetchJob::new(id, "test", 0, |token: CancellationToken| async move {
            token.cancelled().await;
            Err(OrchestratorError::Cancelled)
        })
    }

    fn config(max_concurrent: usize) -> PrefetchConfig {
        PrefetchConfig {
            max_concurrent,
            ..PrefetchConfig::default()
        }
    }

    /// Lets spawned jobs run to completion under a paused clock.
    async fn settle() {
        time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn test_pop_order_by_priority() {
        let mut state = SchedulerState::new();
        let max_age = Duration::from_secs(300);
        for (id, priority) in [("a", 1), ("b", 3), ("c", 2)] {
            assert_eq!(state.enqueue(job(id, priority), max_age), EnqueueOutcome::Queued);
        }

        let order: Vec<String> = std::iter::from_fn(|| state.pop_next().map(|q| q.job.id)).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_equal_priority_keeps_enqueue_order() {
        let mut state = SchedulerState::new();
        let max_age = Duration::from_secs(300);
        for id in ["first", "second", "third"] {
            state.enqueue(job(id, 1), max_age);
        }

        let order: Vec<String> = std::iter::from_fn(|| state.pop_next().map(|q| q.job.id)).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_reenqueue_raises_priority_in_place() {
        let mut state = SchedulerState::new();
        let max_age = Duration::from_secs(300);
        state.enqueue(job("a", 1), max_age);
        state.enqueue(job("b", 2), max_age);

        assert_eq!(state.enqueue(job("a", 5), max_age), EnqueueOutcome::PriorityRaised);
        assert_eq!(state.enqueue(job("a", 4), max_age), EnqueueOutcome::AlreadyQueued);
        assert_eq!(state.queued.len(), 2);

        let first = state.pop_next().unwrap();
        assert_eq!((first.job.id.as_str(), first.job.priority), ("a", 5));
        assert_eq!(state.pop_next().unwrap().job.id, "b");
        // the stale entry for "a" is skipped
        assert!(state.pop_next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_queue_respects_concurrency() {
        let scheduler = PrefetchScheduler::new(config(2));
        for id in ["a", "b", "c", "d", "e"] {
            scheduler.enqueue(pending_job(id)).await;
        }

        assert_eq!(scheduler.process_queue().await, 2);
        assert_eq!(scheduler.process_queue().await, 0);

        let stats = scheduler.stats().await;
        assert_eq!(stats.executing, 2);
        assert_eq!(stats.queue_len, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_job_is_in_flight() {
        let scheduler = PrefetchScheduler::new(config(1));
        scheduler.enqueue(pending_job("a")).await;
        scheduler.process_queue().await;

        assert_eq!(scheduler.enqueue(pending_job("a")).await, EnqueueOutcome::InFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_job_is_not_refetched_until_max_age() {
        let runs = Arc::new(StdMutex::new(0));
        let counted = {
            let runs = Arc::clone(&runs);
            PrefetchJob::new("user-1", "detail", 0, move |_| {
                *runs.lock().unwrap() += 1;
                async { Ok(()) }
            })
        };
        let scheduler = PrefetchScheduler::new(config(3));

        scheduler.enqueue(counted.clone()).await;
        scheduler.process_queue().await;
        settle().await;

        assert_eq!(*runs.lock().unwrap(), 1);
        assert_eq!(scheduler.stats().await.completed, 1);
        assert_eq!(scheduler.enqueue(counted.clone()).await, EnqueueOutcome::RecentlyFetched);

        time::advance(Duration::from_secs(301)).await;
        scheduler.process_queue().await;
        assert_eq!(scheduler.stats().await.history_len, 0);
        assert_eq!(scheduler.enqueue(counted).await, EnqueueOutcome::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_counted_not_propagated() {
        let scheduler = PrefetchScheduler::new(config(3));
        scheduler
            .enqueue(PrefetchJob::new("broken", "test", 0, |_| async {
                Err(OrchestratorError::NetworkFailure("503".to_string()))
            }))
            .await;
        scheduler
            .enqueue(PrefetchJob::new("panics", "test", 0, |_| async {
                panic!("boom");
            }))
            .await;
        scheduler.enqueue(job("fine", 0)).await;

        assert_eq!(scheduler.process_queue().await, 3);
        settle().await;

        let stats = scheduler.stats().await;
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.executing, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_timeout_cancels_token() {
        let observed = Arc::new(StdMutex::new(None));
        let hung = {
            let observed = Arc::clone(&observed);
            PrefetchJob::new("slow", "test", 0, move |token: CancellationToken| {
                *observed.lock().unwrap() = Some(token);
                futures::future::pending()
            })
        };
        let scheduler = PrefetchScheduler::new(PrefetchConfig {
            job_timeout: Duration::from_millis(500),
            ..PrefetchConfig::default()
        });

        scheduler.enqueue(hung).await;
        scheduler.process_queue().await;
        time::sleep(Duration::from_millis(600)).await;

        let stats = scheduler.stats().await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.executing, 0);
        let token = observed.lock().unwrap().clone().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_queued_and_running() {
        let scheduler = PrefetchScheduler::new(config(1));
        scheduler.enqueue(pending_job("running")).await;
        scheduler.enqueue(pending_job("queued")).await;
        scheduler.process_queue().await;

        assert!(scheduler.cancel("queued").await);
        assert!(scheduler.cancel("running").await);
        assert!(!scheduler.cancel("missing").await);
        settle().await;

        let stats = scheduler.stats().await;
        assert_eq!(stats.queue_len, 0);
        assert_eq!(stats.executing, 0);
        // cancellation is neither success nor failure
        assert_eq!((stats.completed, stats.failed), (0, 0));
        assert_eq!(scheduler.process_queue().await, 0);
    }

    #[tokio::test]
    async fn test_strategies_run_in_priority_order() {
        let scheduler = PrefetchScheduler::new(config(3));
        let on_list = |ctx: &Value| ctx["page"] == "list";

        scheduler
            .add_strategy(Strategy::new("low", 1, on_list, |_| vec![job("low-job", 0)]))
            .await;
        scheduler
            .add_strategy(Strategy::new("high", 9, on_list, |_| {
                vec![job("high-job", 0), job("shared", 0)]
            }))
            .await;
        scheduler
            .add_strategy(Strategy::new("other", 5, |ctx| ctx["page"] == "detail", |_| {
                vec![job("detail-job", 0)]
            }))
            .await;

        assert_eq!(scheduler.strategy_names().await, vec!["high", "other", "low"]);

        let scheduled = scheduler.prefetch_for_context(&json!({"page": "list"})).await;
        assert_eq!(scheduled, 3);
        assert_eq!(scheduler.stats().await.queue_len, 3);

        // same jobs again: nothing new
        assert_eq!(scheduler.prefetch_for_context(&json!({"page": "list"})).await, 0);

        assert!(scheduler.remove_strategy("low").await);
        assert!(!scheduler.remove_strategy("low").await);
        assert_eq!(scheduler.stats().await.strategies, 2);
    }

    #[tokio::test]
    async fn test_hover_without_view_queues_detail() {
        let scheduler = PrefetchScheduler::new(config(3));
        scheduler
            .add_rule(
                BehaviorRule::new("hover", 2, |ctx| {
                    let id = ctx["item"].as_str().unwrap_or_default();
                    vec![job(&format!("detail-{id}"), 1)]
                })
                .unless("view"),
            )
            .await;

        let viewed = json!({"item": "a"});
        scheduler.record_user_behavior("view", &viewed).await;
        for _ in 0..4 {
            scheduler.record_user_behavior("hover", &viewed).await;
        }
        assert_eq!(scheduler.stats().await.queue_len, 0);

        let browsed = json!({"item": "b"});
        assert_eq!(scheduler.record_user_behavior("hover", &browsed).await, 1);
        assert_eq!(scheduler.record_user_behavior("hover", &browsed).await, 2);
        assert_eq!(scheduler.stats().await.queue_len, 0);
        assert_eq!(scheduler.record_user_behavior("hover", &browsed).await, 3);
        assert_eq!(scheduler.stats().await.queue_len, 1);

        assert_eq!(scheduler.behavior_count("hover", &viewed).await, 4);
        assert_eq!(scheduler.behavior_count("view", &browsed).await, 0);
    }

    #[tokio::test]
    async fn test_behavior_context_key_ignores_field_order() {
        let scheduler = PrefetchScheduler::new(config(3));
        let ctx: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();

        scheduler.record_user_behavior("scroll", &json!({"a": 1, "b": 2})).await;
        assert_eq!(scheduler.record_user_behavior("scroll", &ctx).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_processes_and_destroy_stops() {
        let scheduler = PrefetchScheduler::new(config(2));
        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);

        scheduler.enqueue(job("a", 0)).await;
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.stats().await.completed, 1);

        scheduler.enqueue(pending_job("b")).await;
        scheduler.enqueue(pending_job("c")).await;
        scheduler.enqueue(pending_job("d")).await;
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.stats().await.executing, 2);

        scheduler.destroy().await;
        assert!(!scheduler.is_running().await);
        settle().await;

        let stats = scheduler.stats().await;
        assert_eq!(stats.queue_len, 0);
        assert_eq!(stats.executing, 0);

        // restartable
        assert!(scheduler.start().await);
        scheduler.destroy().await;
    }
}
