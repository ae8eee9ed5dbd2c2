//! Cache Store Module
//!
//! Main cache engine combining insertion-ordered storage with TTL expiration
//! and a pluggable eviction strategy.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::cache::{CacheEntry, CacheStats, EvictionStrategy, Matcher};
use crate::config::Config;
use crate::error::{OrchestratorError, Result};

// == Cache Store ==
/// Main cache storage with TTL support and strategy-driven eviction.
///
/// The store is a plain single-owner structure; share it across tasks behind
/// `Arc<tokio::sync::RwLock<CacheStore<V>>>` so check-then-act sequences such
/// as eviction selection stay atomic.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage in insertion order
    entries: IndexMap<String, CacheEntry<V>>,
    /// Victim selection when full
    strategy: EvictionStrategy,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new LRU CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries (values below 1 are raised to 1)
    /// * `default_ttl` - TTL for entries stored without an explicit one
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self::with_strategy(max_size, default_ttl, EvictionStrategy::Lru)
    }

    /// Creates a new CacheStore using the given eviction strategy.
    pub fn with_strategy(max_size: usize, default_ttl: Duration, strategy: EvictionStrategy) -> Self {
        Self {
            entries: IndexMap::new(),
            strategy,
            stats: CacheStats::new(),
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// Creates a new CacheStore from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_strategy(
            config.cache_max_size,
            config.cache_default_ttl(),
            config.eviction_strategy,
        )
    }

    // == Set ==
    /// Stores a payload under `key` with optional TTL.
    ///
    /// If the key already exists, the entry is replaced wholesale and keeps its
    /// position. If the key is new and the cache is at capacity, exactly one
    /// entry is evicted per the configured strategy before insertion.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `data` - The payload to store
    /// * `ttl` - Optional TTL (uses the default TTL if None)
    pub fn set(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        let now = Instant::now();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_one();
        }

        let entry = CacheEntry::new_at(data, ttl.unwrap_or(self.default_ttl), now);
        self.entries.insert(key, entry);

        if self.entries.len() > self.max_size {
            let found = self.entries.len();
            error!(
                found,
                max_size = self.max_size,
                "Cache size invariant violated, reinitializing store"
            );
            self.entries.clear();
            self.stats.set_total_entries(0);
            return Err(OrchestratorError::CacheCorruption(format!(
                "store held {} entries with max size {}",
                found, self.max_size
            )));
        }

        self.stats.record_write();
        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Get ==
    /// Retrieves a payload by key.
    ///
    /// Returns the payload if found and not expired. Expired entries are
    /// removed and counted as misses; hits update the entry's access metadata.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_expired(key);
            self.stats.record_miss();
            debug!(key, "Cache entry expired on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch_at(now);
        self.stats.record_hit();
        Some(entry.data.clone())
    }

    // == Has ==
    /// Checks whether a live entry exists for `key`.
    ///
    /// Expired entries are removed, but access metadata and hit/miss counters
    /// are left untouched.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(Instant::now()),
            None => return false,
        };

        if expired {
            self.remove_expired(key);
        }
        !expired
    }

    // == Peek ==
    /// Returns the live entry for `key` without recording an access.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(Instant::now()))
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.shift_remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Invalidate ==
    /// Removes every entry selected by `matcher`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, matcher: &Matcher<V>) -> usize {
        let before = self.entries.len();
        match matcher {
            Matcher::Exact(key) => {
                self.entries.shift_remove(key);
            }
            _ => self.entries.retain(|key, entry| !matcher.matches(key, entry)),
        }

        let removed = before - self.entries.len();
        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(self.entries.len());
        debug!(?matcher, removed, "Cache invalidated");
        removed
    }

    // == Cleanup ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Drops every entry; counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Keys in iteration order, including not-yet-swept expired ones.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_expired(&mut self, key: &str) {
        self.entries.shift_remove(key);
        self.stats.record_expirations(1);
        self.stats.set_total_entries(self.entries.len());
    }

    fn evict_one(&mut self) {
        let victim = self
            .strategy
            .select_victim(&self.entries)
            .map(str::to_string);

        if let Some(victim) = victim {
            self.entries.shift_remove(&victim);
            self.stats.record_eviction();
            debug!(key = %victim, strategy = %self.strategy, "Evicted cache entry");
        }
    }
}
