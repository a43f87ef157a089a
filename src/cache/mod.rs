//! Time-bounded response cache for the home feed.
//!
//! Entries live for `cache.index_ttl_seconds` and are never invalidated by
//! writes, so a freshly created post shows up on `/` only after the entry
//! expires or the cache is cleared.

mod config;
mod keys;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{ResponseKey, hash_query};
pub use middleware::{CacheState, response_cache_layer, should_store_response};
pub use store::{
    CachedResponse, Lookup, METRIC_EVICT, METRIC_EXPIRED, METRIC_HIT, METRIC_MISS, ResponseStore,
};
