//! In-memory storage for rendered responses.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use axum::http::Extensions;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::ResponseKey;

pub const METRIC_HIT: &str = "yatube_cache_hit_total";
pub const METRIC_MISS: &str = "yatube_cache_miss_total";
pub const METRIC_EXPIRED: &str = "yatube_cache_expired_total";
pub const METRIC_EVICT: &str = "yatube_cache_evict_total";

/// A buffered response ready to be replayed.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Response extensions set by the handler, replayed on every hit.
    pub extensions: Extensions,
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(CachedResponse),
    Miss,
    Expired,
}

/// LRU map of responses, each valid for a fixed time-to-live.
///
/// Nothing is invalidated on writes; entries only go away when they expire,
/// get evicted, or `clear` is called.
pub struct ResponseStore {
    entries: RwLock<LruCache<ResponseKey, Entry>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.response_limit_non_zero())),
            ttl: config.index_ttl(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, key: &ResponseKey) -> Lookup {
        let now = Instant::now();
        let mut entries = self.write("lookup");
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!(METRIC_HIT).increment(1);
                Lookup::Hit(entry.response.clone())
            }
            Some(_) => {
                entries.pop(key);
                counter!(METRIC_EXPIRED).increment(1);
                debug!(target = "yatube::cache", path = %key.path, "cached response expired");
                Lookup::Expired
            }
            None => {
                counter!(METRIC_MISS).increment(1);
                Lookup::Miss
            }
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        match self.lookup(key) {
            Lookup::Hit(response) => Some(response),
            Lookup::Miss | Lookup::Expired => None,
        }
    }

    /// Store a response; returns the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        let evicted = self
            .write("set")
            .push(key.clone(), entry)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if let Some(evicted_key) = &evicted {
            counter!(METRIC_EVICT).increment(1);
            debug!(target = "yatube::cache", path = %evicted_key.path, "cached response evicted");
        }
        evicted
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        self.write("clear").clear();
        debug!(target = "yatube::cache", "response cache cleared");
    }

    pub fn len(&self) -> usize {
        self.read("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries carry no cross-field invariants, so a poisoned lock is still usable.
    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, LruCache<ResponseKey, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "recovered poisoned response store lock");
            poisoned.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<ResponseKey, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "recovered poisoned response store lock");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(limit: usize) -> ResponseStore {
        ResponseStore::new(&CacheConfig {
            enabled: true,
            index_ttl_seconds: 20,
            response_limit: limit,
        })
    }

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(body),
            extensions: Extensions::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = store(4);
        let key = ResponseKey::new("/", "", None);
        store.set(key.clone(), response("hello"));

        tokio::time::advance(Duration::from_secs(19)).await;
        let cached = store.get(&key).expect("still fresh");
        assert_eq!(cached.body, Bytes::from("hello"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(store.lookup(&key), Lookup::Expired));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn lru_evicts_oldest_entry() {
        let store = store(2);
        let first = ResponseKey::new("/", "page=1", None);
        let second = ResponseKey::new("/", "page=2", None);
        let third = ResponseKey::new("/", "page=3", None);

        assert!(store.set(first.clone(), response("1")).is_none());
        assert!(store.set(second.clone(), response("2")).is_none());
        assert_eq!(store.set(third.clone(), response("3")), Some(first.clone()));

        assert!(store.get(&first).is_none());
        assert!(store.get(&second).is_some());
        assert!(store.get(&third).is_some());
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let store = store(4);
        store.set(ResponseKey::new("/", "", None), response("a"));
        store.set(ResponseKey::new("/", "", Some(1)), response("b"));
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let store = store(4);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.entries.write().expect("lock");
            panic!("poison");
        }));
        assert!(store.entries.is_poisoned());

        store.set(ResponseKey::new("/", "", None), response("after"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn overwriting_a_key_is_not_an_eviction() {
        let store = store(1);
        let key = ResponseKey::new("/", "", None);
        store.set(key.clone(), response("old"));
        assert!(store.set(key.clone(), response("new")).is_none());
        assert_eq!(store.get(&key).expect("cached").body, Bytes::from("new"));
    }
}
