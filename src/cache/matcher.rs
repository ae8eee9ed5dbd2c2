//! Invalidation matchers.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::cache::CacheEntry;

/// Predicate over a key and its entry.
pub type EntryPredicate<V> = Arc<dyn Fn(&str, &CacheEntry<V>) -> bool + Send + Sync>;

// == Matcher ==
/// Selects cache entries to invalidate.
pub enum Matcher<V> {
    /// Exactly this key
    Exact(String),
    /// Every key the regex matches
    Pattern(Regex),
    /// Every entry the predicate accepts
    Predicate(EntryPredicate<V>),
}

impl<V> Matcher<V> {
    pub fn exact(key: impl Into<String>) -> Self {
        Matcher::Exact(key.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &CacheEntry<V>) -> bool + Send + Sync + 'static,
    {
        Matcher::Predicate(Arc::new(f))
    }

    // == Matches ==
    /// Returns true when the entry stored under `key` is selected.
    pub fn matches(&self, key: &str, entry: &CacheEntry<V>) -> bool {
        match self {
            Matcher::Exact(exact) => exact == key,
            Matcher::Pattern(regex) => regex.is_match(key),
            Matcher::Predicate(predicate) => predicate(key, entry),
        }
    }
}

impl<V> Clone for Matcher<V> {
    fn clone(&self) -> Self {
        match self {
            Matcher::Exact(key) => Matcher::Exact(key.clone()),
            Matcher::Pattern(regex) => Matcher::Pattern(regex.clone()),
            Matcher::Predicate(predicate) => Matcher::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<V> fmt::Debug for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            Matcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<V> From<Regex> for Matcher<V> {
    fn from(regex: Regex) -> Self {
        Matcher::Pattern(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_each_variant() {
        let entry = CacheEntry::new(42u32, Duration::from_secs(1));

        assert!(Matcher::exact("prompts").matches("prompts", &entry));
        assert!(!Matcher::exact("prompts").matches("prompts/1", &entry));

        let pattern: Matcher<u32> = Regex::new(r"^prompts/\d+$").unwrap().into();
        assert!(pattern.matches("prompts/17", &entry));
        assert!(!pattern.matches("users/17", &entry));

        let big = Matcher::predicate(|_, e: &CacheEntry<u32>| e.data > 40);
        assert!(big.matches("anything", &entry));
        assert_eq!(format!("{:?}", big), "Predicate(..)");
    }
}
