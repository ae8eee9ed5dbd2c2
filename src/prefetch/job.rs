//! Prefetch job definition.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

type JobFn = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync>;

// == Prefetch Job ==
/// A speculative fetch identified by the logical resource it loads.
///
/// Two jobs with the same `id` are the same prefetch; the queue keeps one.
#[derive(Clone)]
pub struct PrefetchJob {
    pub id: String,
    /// Free-form category, used for logging
    pub kind: String,
    /// Higher runs first
    pub priority: i32,
    pub context: Value,
    run: JobFn,
}

impl PrefetchJob {
    pub fn new<F, Fut>(id: impl Into<String>, kind: impl Into<String>, priority: i32, run: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            id: id.into(),
            kind: kind.into(),
            priority,
            context: Value::Null,
            run: Arc::new(move |token| run(token).boxed()),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Starts the job's work; it should stop early once `token` is cancelled.
    pub fn run(&self, token: CancellationToken) -> BoxFuture<'static, Result<()>> {
        (self.run)(token)
    }
}

impl fmt::Debug for PrefetchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchJob")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
