//! Resolution caching.
//!
//! Resolution is pure given an immutable declaration and registry, so each
//! outcome (success or failure) is stored once per key and shared between
//! validation runs, including runs on different threads. The cache is an
//! LRU bounded by entry count; an evicted key is simply resolved again.

use crate::callbacks::resolver::ResolvedInvocable;
use crate::core::declaration::DeclarationId;
use crate::core::error::ResolutionResult;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of cached resolutions.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// A cache key combining declaration ID with the target type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The declaration.
    pub declaration: DeclarationId,
    /// Name the target type is registered under.
    pub type_name: String,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(declaration: DeclarationId, type_name: impl Into<String>) -> Self {
        Self {
            declaration,
            type_name: type_name.into(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Thread-safe, write-once-per-key LRU cache of resolutions.
pub struct ResolutionCache<T> {
    entries: Mutex<LruCache<CacheKey, ResolutionResult<ResolvedInvocable<T>>>>,
    stats: Mutex<CacheStats>,
}

impl<T> ResolutionCache<T> {
    /// Create an empty cache holding [`DEFAULT_CACHE_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Get a cached resolution.
    pub fn get(&self, key: &CacheKey) -> Option<ResolutionResult<ResolvedInvocable<T>>> {
        let found = self.entries.lock().get(key).cloned();

        let mut stats = self.stats.lock();
        match found {
            Some(_) => stats.hits += 1,
            None => stats.misses += 1,
        }
        found
    }

    /// Get a cached resolution, computing and storing it on a miss.
    ///
    /// When two threads race on the same key, the first stored value wins
    /// and both callers receive it.
    pub fn get_or_resolve<F>(&self, key: CacheKey, resolve: F) -> ResolutionResult<ResolvedInvocable<T>>
    where
        F: FnOnce() -> ResolutionResult<ResolvedInvocable<T>>,
    {
        if let Some(cached) = self.get(&key) {
            log::trace!("Resolution cache hit for declaration {}", key.declaration);
            return cached;
        }

        let resolved = resolve();
        let mut entries = self.entries.lock();
        if let Some(stored) = entries.get(&key) {
            return stored.clone();
        }
        if entries.push(key, resolved.clone()).is_some() {
            self.stats.lock().evictions += 1;
        }
        resolved
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ResolutionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared cache wrapped in Arc.
pub type SharedResolutionCache<T> = Arc<ResolutionCache<T>>;

/// Create a new shared cache.
pub fn new_shared_cache<T>() -> SharedResolutionCache<T> {
    Arc::new(ResolutionCache::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::resolver::InvocableKind;
    use crate::core::context::ExecutionContext;
    use crate::core::error::ResolutionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Author;

    fn closure_invocable() -> ResolvedInvocable<Author> {
        ResolvedInvocable::Closure {
            label: None,
            closure: Arc::new(|_: &Author, ctx: &mut ExecutionContext| ctx.add_violation("x")),
        }
    }

    #[test]
    fn test_get_or_resolve_runs_once() {
        let cache = ResolutionCache::<Author>::new();
        let key = CacheKey::new(DeclarationId::new(), "Author");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let resolved = cache
                .get_or_resolve(key.clone(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(closure_invocable())
                })
                .unwrap();
            assert_eq!(resolved.kind(), InvocableKind::Closure);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_failures_are_cached() {
        let cache = ResolutionCache::<Author>::new();
        let declaration = DeclarationId::new();
        let key = CacheKey::new(declaration, "Author");
        let error = ResolutionError::UnsupportedCallableKind {
            declaration,
            callback: "::check".to_string(),
        };

        let first = cache.get_or_resolve(key.clone(), || Err(error.clone()));
        let second = cache.get_or_resolve(key, || Ok(closure_invocable()));

        assert_eq!(first.unwrap_err(), error);
        assert_eq!(second.unwrap_err(), error);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let cache = ResolutionCache::<Author>::new();
        let key = CacheKey::new(DeclarationId::new(), "Author");

        cache.get_or_resolve(key.clone(), || Ok(closure_invocable())).unwrap();
        let again = cache
            .get_or_resolve(key.clone(), || {
                Err(ResolutionError::NotFound {
                    declaration: key.declaration,
                    type_name: "Author".to_string(),
                    callback: "late".to_string(),
                })
            })
            .unwrap();
        assert_eq!(again.kind(), InvocableKind::Closure);
    }

    #[test]
    fn test_keys_are_per_type() {
        let cache = ResolutionCache::<Author>::new();
        let declaration = DeclarationId::new();

        cache.get_or_resolve(CacheKey::new(declaration, "Author"), || Ok(closure_invocable())).unwrap();
        cache.get_or_resolve(CacheKey::new(declaration, "Editor"), || Ok(closure_invocable())).unwrap();

        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cache = ResolutionCache::<Author>::with_capacity(2);
        let keys: Vec<CacheKey> = (0..3).map(|_| CacheKey::new(DeclarationId::new(), "Author")).collect();

        for key in &keys {
            cache.get_or_resolve(key.clone(), || Ok(closure_invocable())).unwrap();
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[2]).is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = ResolutionCache::<Author>::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = new_shared_cache::<Author>();
        let key = CacheKey::new(DeclarationId::new(), "Author");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || {
                    cache.get_or_resolve(key, || Ok(closure_invocable())).is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.len(), 1);
    }
}
