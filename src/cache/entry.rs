//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with its payload and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored payload
    pub data: V,
    /// Insertion time
    pub created_at: Instant,
    /// Time to live, measured from `created_at`
    pub ttl: Duration,
    /// Number of reads served by this entry
    pub access_count: u64,
    /// Time of the most recent read (or insertion)
    pub last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    ///
    /// # Arguments
    /// * `data` - The payload to store
    /// * `ttl` - How long the entry stays fresh
    pub fn new(data: V, ttl: Duration) -> Self {
        Self::new_at(data, ttl, Instant::now())
    }

    pub(crate) fn new_at(data: V, ttl: Duration, now: Instant) -> Self {
        Self {
            data,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired only once the elapsed time is
    /// strictly greater than its TTL, so a read at exactly `ttl` still hits.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    // == Remaining TTL ==
    /// Returns how long the entry stays fresh, `Duration::ZERO` once expired.
    pub fn remaining_ttl(&self) -> Duration {
        self.remaining_ttl_at(Instant::now())
    }

    pub(crate) fn remaining_ttl_at(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.created_at))
    }

    /// Instant after which the entry counts as expired.
    ///
    /// None when `created_at + ttl` does not fit in an `Instant`, which only
    /// happens for practically unbounded TTLs.
    pub fn expires_at(&self) -> Option<Instant> {
        self.created_at.checked_add(self.ttl)
    }

    // == Touch ==
    /// Records a read of this entry.
    pub fn touch(&mut self) {
        self.touch_at(Instant::now());
    }

    pub(crate) fn touch_at(&mut self, now: Instant) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }
}
