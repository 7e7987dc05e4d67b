//! In-memory TTL cache for GET responses.
//!
//! The cache is an explicit component owned by the application state, with
//! the clock injected so expiry is testable without sleeping.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Arc<[u8]>,
    expires_at: Instant,
}

/// Cache hit/size counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache keyed by request identity (`METHOD:path?sorted-query`).
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache").field("ttl", &self.ttl).finish()
    }
}

impl ResponseCache {
    /// Create a cache with the given TTL and clock.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            ttl,
            clock,
        }
    }

    /// Create a cache with the system clock and a TTL in seconds.
    #[must_use]
    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self::new(Duration::from_secs(ttl_secs), Arc::new(SystemClock))
    }

    /// Look up a cached body. Expired entries are removed on access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let hit = match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(Arc::clone(&entry.body)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if hit.is_some() {
            stats.hits = stats.hits.saturating_add(1);
        } else {
            stats.misses = stats.misses.saturating_add(1);
        }
        hit
    }

    /// Store a body under a key with the configured TTL.
    pub fn set(&self, key: &str, body: &[u8]) {
        let expires_at = self.clock.now().checked_add(self.ttl);
        let Some(expires_at) = expires_at else {
            return;
        };
        let entry = CacheEntry {
            body: Arc::from(body),
            expires_at,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop entries whose key starts with `prefix`. Returns how many were
    /// removed. Used to invalidate all cached pages of a content type after
    /// a mutation.
    #[must_use]
    pub fn clear_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(entries.len())
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let mut stats = *self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.entries = entries;
        stats
    }
}

/// Build the cache key for a request: `METHOD:path` plus the query pairs in
/// sorted order, so parameter order does not split cache entries.
#[must_use]
pub fn cache_key(method: &str, path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        None => format!("{method}:{path}"),
        Some(q) => {
            let mut pairs: Vec<&str> = q.split('&').collect();
            pairs.sort_unstable();
            format!("{method}:{path}?{}", pairs.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock that can be advanced by hand.
    struct ManualClock {
        start: Instant,
        offset_secs: AtomicU64,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset_secs: AtomicU64::new(0),
            }
        }

        fn advance_secs(&self, secs: u64) {
            self.offset_secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + Duration::from_secs(self.offset_secs.load(Ordering::SeqCst))
        }
    }

    fn cache_with_manual_clock(ttl_secs: u64) -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let cache = ResponseCache::new(Duration::from_secs(ttl_secs), clock_dyn);
        (cache, clock)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _clock) = cache_with_manual_clock(300);
        cache.set("GET:/api/projects", b"[]");
        let body = cache.get("GET:/api/projects").unwrap();
        assert_eq!(&*body, b"[]");
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_manual_clock(300);
        cache.set("k", b"v");
        clock.advance_secs(299);
        assert!(cache.get("k").is_some());
        clock.advance_secs(2);
        assert!(cache.get("k").is_none());
        // expired entry was evicted
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_set_refreshes_expiry() {
        let (cache, clock) = cache_with_manual_clock(10);
        cache.set("k", b"v1");
        clock.advance_secs(8);
        cache.set("k", b"v2");
        clock.advance_secs(8);
        let body = cache.get("k").unwrap();
        assert_eq!(&*body, b"v2");
    }

    #[test]
    fn test_clear_prefix_scopes_invalidation() {
        let (cache, _clock) = cache_with_manual_clock(300);
        cache.set("GET:/api/projects", b"a");
        cache.set("GET:/api/projects?offset=6", b"b");
        cache.set("GET:/api/articles", b"c");

        let removed = cache.clear_prefix("GET:/api/projects");
        assert_eq!(removed, 2);
        assert!(cache.get("GET:/api/projects").is_none());
        assert!(cache.get("GET:/api/articles").is_some());
    }

    #[test]
    fn test_clear_drops_everything() {
        let (cache, _clock) = cache_with_manual_clock(300);
        cache.set("a", b"1");
        cache.set("b", b"2");
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let (cache, _clock) = cache_with_manual_clock(300);
        cache.set("k", b"v");
        let _unused = cache.get("k");
        let _unused = cache.get("k");
        let _unused = cache.get("absent");
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_cache_key_sorts_query_pairs() {
        assert_eq!(
            cache_key("GET", "/api/products", Some("offset=6&limit=3")),
            cache_key("GET", "/api/products", Some("limit=3&offset=6"))
        );
    }

    #[test]
    fn test_cache_key_without_query() {
        assert_eq!(cache_key("GET", "/api/products", None), "GET:/api/products");
        assert_eq!(
            cache_key("GET", "/api/products", Some("")),
            "GET:/api/products"
        );
    }
}
