//! Cache Module
//!
//! Provides in-memory response caching with TTL expiration and LRU, FIFO or
//! shortest-remaining-TTL eviction.

mod entry;
mod eviction;
mod matcher;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use eviction::EvictionStrategy;
pub use matcher::{EntryPredicate, Matcher};
pub use stats::CacheStats;
pub use store::CacheStore;
