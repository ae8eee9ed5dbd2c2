//! Debounce Module
//!
//! Coalesces bursts of calls into a single invocation of an async function,
//! with optional leading-edge invocation and a hard `max_wait` ceiling.
//!
//! # Timing
//! - Every call restarts the quiet period of `wait`.
//! - The trailing edge invokes with the arguments of the last call in the burst.
//! - With `leading`, the first call of a burst invokes immediately.
//! - With `max_wait`, an unbroken burst still invokes no later than `max_wait`
//!   after it began.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

type DebouncedFn<A, R, E> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, E>> + Send + Sync>;
type Waiter<R, E> = oneshot::Sender<Result<Debounced<R>, E>>;

// == Options ==
/// Edge and ceiling configuration for a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Invoke on the first call of a burst
    pub leading: bool,
    /// Invoke after the burst goes quiet
    pub trailing: bool,
    /// Longest a burst may postpone invocation; raised to `wait` if smaller
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }
}

// == Call Outcome ==
/// What happened to one call of a debounced function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Debounced<R> {
    /// This call's arguments were passed to the function
    Invoked(R),
    /// A later call in the same burst replaced these arguments
    Superseded,
    /// The pending invocation was discarded by `cancel()` or the debouncer was dropped
    Cancelled,
}

impl<R> Debounced<R> {
    pub fn invoked(self) -> Option<R> {
        match self {
            Debounced::Invoked(value) => Some(value),
            _ => None,
        }
    }
}

struct DebounceState<A, R, E> {
    last_args: Option<A>,
    /// Waiter belonging to the call whose arguments are buffered
    waiter: Option<Waiter<R, E>>,
    last_call_time: Option<Instant>,
    last_invoke_time: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is replaced or cleared
    generation: u64,
}

struct Inner<A, R, E> {
    func: DebouncedFn<A, R, E>,
    wait: Duration,
    options: DebounceOptions,
    state: Mutex<DebounceState<A, R, E>>,
}

// == Debouncer ==
/// Debounced wrapper around an async function.
///
/// Must be used from within a Tokio runtime. Cloning yields a handle to the
/// same debouncer.
pub struct Debouncer<A, R, E> {
    inner: Arc<Inner<A, R, E>>,
}

impl<A, R, E> Clone for Debouncer<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R, E> Debouncer<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    // == Constructor ==
    /// Wraps `func` so bursts of calls within `wait` collapse into one.
    pub fn new<F, Fut>(func: F, wait: Duration, options: DebounceOptions) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let options = DebounceOptions {
            max_wait: options.max_wait.map(|max_wait| max_wait.max(wait)),
            ..options
        };

        Self {
            inner: Arc::new(Inner {
                func: Arc::new(move |args| func(args).boxed()),
                wait,
                options,
                state: Mutex::new(DebounceState {
                    last_args: None,
                    waiter: None,
                    last_call_time: None,
                    last_invoke_time: None,
                    timer: None,
                    generation: 0,
                }),
            }),
        }
    }

    // == Call ==
    /// Registers a call immediately and returns a future for its outcome.
    ///
    /// Only the call whose arguments reach the function observes `Invoked` or
    /// the function's error; calls coalesced away resolve to `Superseded`.
    pub fn call(&self, args: A) -> impl Future<Output = Result<Debounced<R>, E>> + Send + 'static {
        let inner = &self.inner;
        let now = Instant::now();
        let (tx, rx) = oneshot::channel();

        let mut state = inner.lock();
        let is_invoking = inner.should_invoke(&state, now);

        if let Some(previous) = state.waiter.take() {
            let _ = previous.send(Ok(Debounced::Superseded));
        }
        state.last_args = Some(args);
        state.waiter = Some(tx);
        state.last_call_time = Some(now);

        let mut invocation = None;
        if is_invoking {
            if state.timer.is_none() {
                // Leading edge of a new burst
                state.last_invoke_time = Some(now);
                start_timer(inner, &mut state, inner.wait);
                if inner.options.leading {
                    invocation = take_invocation(&mut state, now);
                }
            } else if inner.options.max_wait.is_some() {
                // max_wait elapsed while calls kept arriving
                start_timer(inner, &mut state, inner.wait);
                invocation = take_invocation(&mut state, now);
            }
        } else if state.timer.is_none() {
            start_timer(inner, &mut state, inner.wait);
        }
        drop(state);

        if let Some((args, waiter)) = invocation {
            inner.invoke(args, waiter);
        }

        async move { rx.await.unwrap_or(Ok(Debounced::Cancelled)) }
    }

    // == Cancel ==
    /// Discards any pending trailing invocation without calling the function.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        clear_timer(&mut state);
        state.last_args = None;
        state.last_call_time = None;
        state.last_invoke_time = None;
        if let Some(waiter) = state.waiter.take() {
            let _ = waiter.send(Ok(Debounced::Cancelled));
        }
    }

    // == Flush ==
    /// Runs the pending trailing invocation now with the buffered arguments.
    ///
    /// Returns true if the function was invoked.
    pub fn flush(&self) -> bool {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.timer.is_none() {
            return false;
        }

        clear_timer(&mut state);
        let invocation = inner.trailing_edge(&mut state, Instant::now());
        drop(state);

        match invocation {
            Some((args, waiter)) => {
                inner.invoke(args, waiter);
                true
            }
            None => false,
        }
    }

    // == Pending ==
    /// Reports whether a trailing-edge timer is scheduled.
    pub fn pending(&self) -> bool {
        self.inner.lock().timer.is_some()
    }
}

impl<A, R, E> Inner<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, DebounceState<A, R, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_invoke(&self, state: &DebounceState<A, R, E>, now: Instant) -> bool {
        let Some(last_call) = state.last_call_time else {
            return true;
        };

        let max_wait_elapsed = match (self.options.max_wait, state.last_invoke_time) {
            (Some(max_wait), Some(last_invoke)) => {
                now.saturating_duration_since(last_invoke) >= max_wait
            }
            (Some(_), None) => true,
            (None, _) => false,
        };

        now.saturating_duration_since(last_call) >= self.wait || max_wait_elapsed
    }

    fn remaining_wait(&self, state: &DebounceState<A, R, E>, now: Instant) -> Duration {
        let since_call = state
            .last_call_time
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        let waiting = self.wait.saturating_sub(since_call);

        match self.options.max_wait {
            Some(max_wait) => {
                let since_invoke = state
                    .last_invoke_time
                    .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
                waiting.min(max_wait.saturating_sub(since_invoke))
            }
            None => waiting,
        }
    }

    fn trailing_edge(
        &self,
        state: &mut DebounceState<A, R, E>,
        now: Instant,
    ) -> Option<(A, Option<Waiter<R, E>>)> {
        if self.options.trailing && state.last_args.is_some() {
            return take_invocation(state, now);
        }

        state.last_args = None;
        if let Some(waiter) = state.waiter.take() {
            let _ = waiter.send(Ok(Debounced::Superseded));
        }
        None
    }

    fn invoke(&self, args: A, waiter: Option<Waiter<R, E>>) {
        trace!("Debounced function invoked");
        let call = (self.func)(args);
        tokio::spawn(async move {
            let result = call.await;
            if let Some(waiter) = waiter {
                let _ = waiter.send(result.map(Debounced::Invoked));
            }
        });
    }
}

fn take_invocation<A, R, E>(
    state: &mut DebounceState<A, R, E>,
    now: Instant,
) -> Option<(A, Option<Waiter<R, E>>)> {
    let args = state.last_args.take()?;
    state.last_invoke_time = Some(now);
    Some((args, state.waiter.take()))
}

fn clear_timer<A, R, E>(state: &mut DebounceState<A, R, E>) {
    if let Some(timer) = state.timer.take() {
        timer.abort();
    }
    state.generation += 1;
}

/// Replaces the timer with one that re-checks the burst after `delay`.
///
/// The task holds only a weak reference so dropping the debouncer stops it.
fn start_timer<A, R, E>(
    inner: &Arc<Inner<A, R, E>>,
    state: &mut DebounceState<A, R, E>,
    delay: Duration,
) where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    clear_timer(state);
    let generation = state.generation;
    let weak: Weak<Inner<A, R, E>> = Arc::downgrade(inner);

    state.timer = Some(tokio::spawn(async move {
        let mut delay = delay;
        loop {
            tokio::time::sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let now = Instant::now();
            let mut state = inner.lock();
            if state.generation != generation {
                return;
            }

            if inner.should_invoke(&state, now) {
                state.timer = None;
                let invocation = inner.trailing_edge(&mut state, now);
                drop(state);
                if let Some((args, waiter)) = invocation {
                    inner.invoke(args, waiter);
                }
                return;
            }

            delay = inner.remaining_wait(&state, now);
        }
    }));
}
