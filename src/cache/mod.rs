//! Response cache for upstream lookups.
//!
//! Raw `GetItems` bodies are kept under an `spfa_`-prefixed key derived from
//! the sorted identifier set. Entries live for [`CACHE_TTL`] and expire
//! passively on read. Storage is an in-memory LRU:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 512
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CACHE_NAMESPACE, CacheKey, MAX_CACHEABLE_IDS, should_store};
pub use store::{
    CACHE_TTL, CacheEntry, CacheError, METRIC_CACHE_EVICT, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, MemoryCacheStore, ProductCache,
};
