//! Prefetch strategies and behavior rules.
//!
//! A `Strategy` maps a navigation context to jobs when its condition holds.
//! A `BehaviorRule` maps repeated user actions to jobs, e.g. "hovered an item
//! more than twice without opening it".

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::prefetch::PrefetchJob;

type ConditionFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
type JobFactory = Arc<dyn Fn(&Value) -> Vec<PrefetchJob> + Send + Sync>;

// == Strategy ==
#[derive(Clone)]
pub struct Strategy {
    pub name: String,
    /// Strategies are evaluated highest priority first
    pub priority: i32,
    condition: ConditionFn,
    action: JobFactory,
}

impl Strategy {
    pub fn new<C, A>(name: impl Into<String>, priority: i32, condition: C, action: A) -> Self
    where
        C: Fn(&Value) -> bool + Send + Sync + 'static,
        A: Fn(&Value) -> Vec<PrefetchJob> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority,
            condition: Arc::new(condition),
            action: Arc::new(action),
        }
    }

    pub fn applies_to(&self, context: &Value) -> bool {
        (self.condition)(context)
    }

    pub fn jobs_for(&self, context: &Value) -> Vec<PrefetchJob> {
        (self.action)(context)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// == Behavior Rule ==
/// Fires when `action` has been recorded more than `threshold` times for a
/// context and `unless_action` never has.
#[derive(Clone)]
pub struct BehaviorRule {
    pub action: String,
    pub threshold: u32,
    pub unless_action: Option<String>,
    factory: JobFactory,
}

impl BehaviorRule {
    pub fn new<A>(action: impl Into<String>, threshold: u32, factory: A) -> Self
    where
        A: Fn(&Value) -> Vec<PrefetchJob> + Send + Sync + 'static,
    {
        Self {
            action: action.into(),
            threshold,
            unless_action: None,
            factory: Arc::new(factory),
        }
    }

    pub fn unless(mut self, action: impl Into<String>) -> Self {
        self.unless_action = Some(action.into());
        self
    }

    pub(crate) fn fires(&self, count: u32, unless_count: u32) -> bool {
        count > self.threshold && unless_count == 0
    }

    pub(crate) fn jobs_for(&self, context: &Value) -> Vec<PrefetchJob> {
        (self.factory)(context)
    }
}

impl fmt::Debug for BehaviorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRule")
            .field("action", &self.action)
            .field("threshold", &self.threshold)
            .field("unless_action", &self.unless_action)
            .finish_non_exhaustive()
    }
}
