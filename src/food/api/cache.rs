use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::food::api::traits::NutritionSource;
use crate::food::types::{normalize_name, LookupOutcome};

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: LookupOutcome,
    expires_at: Instant,
}

/// Wraps a remote source and remembers its answers for a while, so repeated
/// scans of the same dish do not spend the remote quota.
///
/// Transport failures are never cached.
pub struct CachedSource {
    inner: Arc<dyn NutritionSource>,
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn NutritionSource>, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Wraps `inner` when `capacity` is non-zero, otherwise returns it as-is.
    pub fn wrap(
        inner: Arc<dyn NutritionSource>,
        capacity: usize,
        ttl: Duration,
    ) -> Arc<dyn NutritionSource> {
        match NonZeroUsize::new(capacity) {
            Some(capacity) => Arc::new(Self::new(inner, capacity, ttl)),
            None => inner,
        }
    }

    fn cached(&self, key: &str) -> Option<LookupOutcome> {
        let mut cache = self.cache.lock();
        let expired = match cache.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.outcome.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

#[async_trait]
impl NutritionSource for CachedSource {
    async fn lookup(&self, query: &str) -> LookupOutcome {
        let key = normalize_name(query);
        if let Some(outcome) = self.cached(&key) {
            log::debug!("Cache hit for '{}'", key);
            return outcome;
        }

        let outcome = self.inner.lookup(query).await;
        if !outcome.is_transport_failure() {
            self.cache.lock().put(
                key,
                CacheEntry {
                    outcome: outcome.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        outcome
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}
