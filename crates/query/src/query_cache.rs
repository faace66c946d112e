//! Result cache for query batches.
//!
//! Entries live for a fixed time after insertion and are checked lazily on
//! read. The first request for a key stores a shared future; concurrent
//! requests for the same key await that future instead of computing again,
//! and all of them observe its outcome. A failed computation is evicted
//! once it settles, but only if the entry has not been replaced meanwhile.

use crate::ast::Statement;
use futures::future::{BoxFuture, FutureExt, Shared};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;
use siftql_core::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Prefix of [`QueryCache::clear_key`] patterns that match by substring.
pub const SUBSTRING_PREFIX: char = '~';

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

struct CacheEntry<T> {
    inserted_at: Instant,
    /// Distinguishes a replacement from the entry a waiter started on.
    generation: u64,
    future: SharedResult<T>,
}

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`, or 0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Single-flight TTL cache keyed by canonical batch text.
pub struct QueryCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached result for `key`, or runs `compute` once and
    /// shares its result with every concurrent caller.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (future, generation) = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            match entries.get(key) {
                Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    (entry.future.clone(), entry.generation)
                }
                _ => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = compute().boxed().shared();
                    entries.insert(
                        key.to_string(),
                        CacheEntry {
                            inserted_at: now,
                            generation,
                            future: future.clone(),
                        },
                    );
                    debug!(key_len = key.len(), generation, "cache miss");
                    (future, generation)
                }
            }
        };

        let result = future.await;
        if result.is_err() {
            let mut entries = self.entries.lock();
            if entries
                .get(key)
                .map_or(false, |entry| entry.generation == generation)
            {
                entries.remove(key);
                debug!(generation, "evicted failed cache entry");
            }
        }
        result
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        info!(removed, "query cache cleared");
    }

    /// Drops the entry for `key`, or every entry whose key contains the
    /// rest of `key` when it starts with `~`. Returns how many were removed.
    pub fn clear_key(&self, key: &str) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            match key.strip_prefix(SUBSTRING_PREFIX) {
                Some(fragment) => {
                    let before = entries.len();
                    entries.retain(|k, _| !k.contains(fragment));
                    before - entries.len()
                }
                None => usize::from(entries.remove(key).is_some()),
            }
        };
        info!(removed, substring = key.starts_with(SUBSTRING_PREFIX), "query cache keys cleared");
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Number of stored entries, expired ones included until next read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheKeyParts<'a> {
    statements: &'a [Statement],
    allowed_tables: Option<Vec<&'a str>>,
}

/// Canonical cache key of a batch: the serialized statements plus the
/// sorted, deduplicated allowlist (or `null`).
pub fn cache_key(statements: &[Statement], allowed_tables: Option<&[String]>) -> Result<String> {
    let allowed_tables = allowed_tables.map(|tables| {
        let mut tables: Vec<&str> = tables.iter().map(String::as_str).collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    });
    serde_json::to_string(&CacheKeyParts {
        statements,
        allowed_tables,
    })
    .map_err(|e| Error::invalid_query(format!("cannot build cache key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, QueryValue};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let cache: QueryCache<u32> = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            let calls = calls.clone();
            cache.get_or_compute("k", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(42)
            })
        });
        let results = futures::future::join_all(requests).await;

        assert!(results.iter().all(|r| r == &Ok(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 7,
                misses: 1,
                entries: 1
            }
        );
    }

    async fn next_value(cache: &QueryCache<u32>, calls: &Arc<AtomicUsize>) -> Result<u32> {
        let calls = calls.clone();
        cache
            .get_or_compute("k", move || async move {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache: QueryCache<u32> = QueryCache::new(Duration::from_secs(300));
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(next_value(&cache, &calls).await, Ok(0));
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(next_value(&cache, &calls).await, Ok(0));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(next_value(&cache, &calls).await, Ok(1));
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_then_evicted() {
        let cache: QueryCache<u32> = QueryCache::default();
        let first = cache
            .get_or_compute("k", || async { Err(Error::storage("down")) })
            .await;
        assert_eq!(first, Err(Error::storage("down")));
        assert!(cache.is_empty());

        let second = cache.get_or_compute("k", || async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn test_clear_key() {
        let cache: QueryCache<u32> = QueryCache::default();
        for key in ["posts:1", "posts:2", "users:1"] {
            cache.get_or_compute(key, || async { Ok(1) }).await.unwrap();
        }
        assert_eq!(cache.clear_key("users:1"), 1);
        assert_eq!(cache.clear_key("users:1"), 0);
        assert_eq!(cache.clear_key("~posts"), 2);
        assert!(cache.is_empty());

        cache.get_or_compute("a", || async { Ok(1) }).await.unwrap();
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_cache_key_ignores_allowlist_order() {
        let statements = vec![Statement::new(Expression::basic(
            "posts",
            Some(vec!["title"]),
            QueryValue::text("rust"),
        ))];
        let ab = vec!["a".to_string(), "b".to_string()];
        let ba = vec!["b".to_string(), "a".to_string(), "a".to_string()];

        let key_ab = cache_key(&statements, Some(ab.as_slice())).unwrap();
        assert_eq!(key_ab, cache_key(&statements, Some(ba.as_slice())).unwrap());
        assert_ne!(key_ab, cache_key(&statements, None).unwrap());
        assert!(key_ab.contains(r#""allowedTables":["a","b"]"#));
    }
}
