//! Response cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_INDEX_TTL_SECONDS: u64 = 20;
const DEFAULT_RESPONSE_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve the home feed through the response cache.
    pub enabled: bool,
    /// How long a cached home feed stays fresh.
    pub index_ttl_seconds: u64,
    /// Maximum cached responses before least-recently-used ones are evicted.
    pub response_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_ttl_seconds: DEFAULT_INDEX_TTL_SECONDS,
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            index_ttl_seconds: u64::from(settings.index_ttl_seconds.get()),
            response_limit: settings.response_limit.get() as usize,
        }
    }
}

impl CacheConfig {
    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_seconds)
    }

    /// Returns the response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
