//! Bounded identifier → handle cache that releases every handle it drops.
//!
//! The cache owns its handles. Callers only ever borrow them; a handle leaves
//! the cache by being released through the injected `HandleDisposer`, either
//! because it was evicted, because it was redundant on `set`, or because the
//! cache was cleared or dropped.

mod object_url;

pub use object_url::{HandleDisposer, InMemoryUrlRegistry, ObjectUrl, ObjectUrlRegistry};

use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// Default number of cached handles.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => panic!("default capacity must be non-zero"),
};

/// Fixed-capacity LRU cache of disposable handles.
pub struct HandleCache<K: Hash + Eq, H> {
    entries: LruCache<K, H>,
    disposer: Arc<dyn HandleDisposer<H>>,
}

impl<K, H> HandleCache<K, H>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Creates a cache holding at most `capacity` handles.
    pub fn new(capacity: NonZeroUsize, disposer: Arc<dyn HandleDisposer<H>>) -> Self {
        Self {
            entries: LruCache::new(capacity),
            disposer,
        }
    }

    /// Creates a cache with `DEFAULT_CAPACITY`.
    pub fn with_default_capacity(disposer: Arc<dyn HandleDisposer<H>>) -> Self {
        Self::new(DEFAULT_CAPACITY, disposer)
    }

    /// Looks up a handle and marks it most recently used.
    pub fn get(&mut self, identifier: &K) -> Option<&H> {
        self.entries.get(identifier)
    }

    /// Caches `handle` under `identifier` and returns the cached handle.
    ///
    /// If `identifier` is already cached, `handle` is released right away and
    /// the existing handle is returned. Otherwise `handle` is inserted and,
    /// when the cache is full, the least recently used handle is released.
    pub fn set(&mut self, identifier: K, handle: H) -> &H {
        if self.entries.contains(&identifier) {
            tracing::debug!("Handle for {:?} already cached, releasing incoming", identifier);
            self.disposer.release(handle);
        } else if let Some((evicted, old)) = self.entries.push(identifier.clone(), handle) {
            tracing::debug!("Evicted handle for {:?} (capacity {})", evicted, self.entries.cap());
            self.disposer.release(old);
        }

        // Present in both branches: it was either already cached or just pushed.
        self.entries
            .get(&identifier)
            .expect("entry is cached after set")
    }

    /// Returns true if `identifier` is cached, without touching recency.
    pub fn contains(&self, identifier: &K) -> bool {
        self.entries.contains(identifier)
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached handles.
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.cap()
    }

    /// Releases every cached handle, least recently used first.
    pub fn clear(&mut self) -> usize {
        let mut count = 0;
        while let Some((_, handle)) = self.entries.pop_lru() {
            self.disposer.release(handle);
            count += 1;
        }
        count
    }
}

impl<K: Hash + Eq, H> Drop for HandleCache<K, H> {
    fn drop(&mut self) {
        while let Some((_, handle)) = self.entries.pop_lru() {
            self.disposer.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::CountingDisposer;

    fn cache(capacity: usize) -> (HandleCache<&'static str, u32>, Arc<CountingDisposer>) {
        let disposer = Arc::new(CountingDisposer::default());
        let cache = HandleCache::new(NonZeroUsize::new(capacity).unwrap(), disposer.clone());
        (cache, disposer)
    }

    #[test]
    fn test_set_returns_inserted_handle() {
        let (mut cache, disposer) = cache(2);

        assert_eq!(*cache.set("a", 1), 1);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert!(disposer.released().is_empty());
    }

    #[test]
    fn test_set_existing_releases_incoming_and_keeps_existing() {
        let (mut cache, disposer) = cache(2);
        cache.set("a", 1);

        assert_eq!(*cache.set("a", 2), 1);
        assert_eq!(disposer.released(), vec![2]);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_order_respects_get() {
        let (mut cache, disposer) = cache(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");
        cache.set("c", 3);

        assert_eq!(disposer.released(), vec![2]);
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"a"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_overflow_evicts_in_insertion_order() {
        let (mut cache, disposer) = cache(3);
        for (i, id) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            cache.set(id, i as u32);
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(disposer.released(), vec![0, 1]);
    }

    #[test]
    fn test_every_dropped_handle_released_exactly_once() {
        let (mut cache, disposer) = cache(4);
        let ids = ["a", "b", "c", "d", "e", "f", "a", "g", "b", "h"];
        for (i, id) in ids.into_iter().enumerate() {
            cache.set(id, i as u32);
            assert!(cache.len() <= 4);
        }

        let released = disposer.released();
        let mut live: Vec<u32> = ["a", "b", "c", "d", "e", "f", "g", "h"]
            .iter()
            .filter_map(|id| cache.get(id).copied())
            .collect();
        live.sort_unstable();

        let mut all: Vec<u32> = released.iter().copied().chain(live.iter().copied()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..ids.len() as u32).collect::<Vec<_>>());
        assert!(live.iter().all(|h| !released.contains(h)));
    }

    #[test]
    fn test_get_never_releases() {
        let (mut cache, disposer) = cache(1);
        cache.set("a", 1);
        for _ in 0..5 {
            cache.get(&"a");
            cache.get(&"missing");
        }
        assert!(disposer.released().is_empty());
    }

    #[test]
    fn test_contains_does_not_touch_recency() {
        let (mut cache, disposer) = cache(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.contains(&"a"));
        cache.set("c", 3);

        assert_eq!(disposer.released(), vec![1]);
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut cache, disposer) = cache(3);
        cache.set("a", 1);
        cache.set("b", 2);

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(disposer.released(), vec![1, 2]);
    }

    #[test]
    fn test_drop_releases_remaining_handles() {
        let (mut cache, disposer) = cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        drop(cache);

        assert_eq!(disposer.released(), vec![1, 2]);
    }

    #[test]
    fn test_object_urls_revoked_on_eviction() {
        let registry = Arc::new(InMemoryUrlRegistry::new());
        let mut cache = HandleCache::new(NonZeroUsize::new(1).unwrap(), registry.clone());

        let first = registry.create_object_url(vec![1]);
        let first_text = first.as_str().to_string();
        cache.set("alert", first);
        let second = registry.create_object_url(vec![2]);
        cache.set("ping", second);

        assert!(!registry.is_live(&first_text));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(cache.capacity(), NonZeroUsize::new(1).unwrap());
    }

    #[test]
    fn test_default_capacity() {
        let disposer: Arc<CountingDisposer> = Arc::new(CountingDisposer::default());
        let cache: HandleCache<String, u32> = HandleCache::with_default_capacity(disposer);
        assert_eq!(cache.capacity().get(), 100);
    }
}
