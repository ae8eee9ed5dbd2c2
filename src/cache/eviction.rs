//! Eviction Strategy Module
//!
//! Picks the entry to drop when the cache is at capacity.

use std::fmt;
use std::str::FromStr;

use crate::cache::CacheEntry;

// == Eviction Strategy ==
/// Ordering used to choose an eviction victim.
///
/// Every strategy scans entries in iteration (insertion) order and keeps the
/// first minimum it encounters, so ties go to the earliest-inserted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Smallest `last_accessed_at`
    #[default]
    Lru,
    /// Smallest `created_at`
    Fifo,
    /// Smallest remaining time to live
    Ttl,
}

impl EvictionStrategy {
    // == Select Victim ==
    /// Returns the key that should be evicted, or None if there are no entries.
    ///
    /// TTL ordering compares expiry deadlines, which ranks entries the same
    /// way as signed remaining TTL at any instant: an entry that expired
    /// longer ago goes before one that only just expired.
    ///
    /// # Arguments
    /// * `entries` - Entries in iteration order
    pub fn select_victim<'a, V, I>(&self, entries: I) -> Option<&'a str>
    where
        V: 'a,
        I: IntoIterator<Item = (&'a String, &'a CacheEntry<V>)>,
    {
        let mut victim: Option<(&'a str, &'a CacheEntry<V>)> = None;

        for (key, entry) in entries {
            let replace = match victim {
                None => true,
                Some((_, best)) => self.precedes(entry, best),
            };
            if replace {
                victim = Some((key.as_str(), entry));
            }
        }

        victim.map(|(key, _)| key)
    }

    /// Strict ordering, so the first of several equal candidates is kept.
    fn precedes<V>(&self, candidate: &CacheEntry<V>, best: &CacheEntry<V>) -> bool {
        match self {
            EvictionStrategy::Lru => candidate.last_accessed_at < best.last_accessed_at,
            EvictionStrategy::Fifo => candidate.created_at < best.created_at,
            // an unrepresentable deadline sorts after every real one
            EvictionStrategy::Ttl => match (candidate.expires_at(), best.expires_at()) {
                (Some(candidate), Some(best)) => candidate < best,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Fifo => "fifo",
            EvictionStrategy::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "fifo" => Ok(EvictionStrategy::Fifo),
            "ttl" => Ok(EvictionStrategy::Ttl),
            other => Err(format!("unknown eviction strategy: {}", other)),
        }
    }
}
