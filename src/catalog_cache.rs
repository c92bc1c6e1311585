//! # Catalog Cache Module
//!
//! A read-through cache in front of any [`IngredientCatalog`].
//!
//! Receipts from the same store repeat the same product lines, so the same
//! lookups come back again and again. Entries are tagged with the cache
//! generation; [`CachedCatalog::invalidate`] bumps the generation and drops
//! every entry, and it must be called whenever the catalog changes.
//!
//! The cache holds at most `capacity` lookups and evicts the least recently
//! used one when full, so a stream of distinct receipt lines cannot grow it
//! without bound.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, trace};

use crate::errors::StoreResult;
use crate::recipe_model::IngredientRecord;
use crate::store::IngredientCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LookupKey {
    Exact(String),
    Containing(String, usize),
    ContainedIn(String, usize),
}

#[derive(Debug, Clone)]
enum CachedValue {
    One(Option<IngredientRecord>),
    Many(Vec<IngredientRecord>),
}

/// Default number of cached lookups
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct CacheState {
    generation: u64,
    entries: LruCache<LookupKey, CachedValue>,
}

/// Thread-safe read-through cache for catalog lookups
///
/// # Thread Safety
///
/// Uses a `Mutex` around the entry map; the lock is never held across a call
/// to the wrapped catalog. A lookup that started before an invalidation does
/// not store its result afterwards.
pub struct CachedCatalog<C> {
    inner: C,
    state: Mutex<CacheState>,
}

impl<C: IngredientCatalog> CachedCatalog<C> {
    /// Wrap a catalog with an empty cache
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_recipes::catalog_cache::CachedCatalog;
    /// use receipt_recipes::memory_store::InMemoryCatalog;
    ///
    /// let catalog = CachedCatalog::new(InMemoryCatalog::from_names(["사과", "우유"]));
    /// assert_eq!(catalog.entry_count(), 0);
    /// ```
    pub fn new(inner: C) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Wrap a catalog, keeping at most `capacity` lookups (at least one)
    pub fn with_capacity(inner: C, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: Mutex::new(CacheState {
                generation: 0,
                entries: LruCache::new(capacity),
            }),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop every cached entry and start a new generation
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        let count = state.entries.len();
        state.generation += 1;
        state.entries.clear();
        info!(
            generation = state.generation,
            dropped = count,
            "Invalidated catalog cache"
        );
    }

    /// Current cache generation, bumped by every invalidation
    pub fn generation(&self) -> u64 {
        self.lock_state().generation
    }

    /// Number of cached lookups
    pub fn entry_count(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Maximum number of cached lookups
    pub fn capacity(&self) -> usize {
        self.lock_state().entries.cap().get()
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // Entries are plain data, so a poisoned lock still holds a usable map
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self, key: &LookupKey) -> (Option<CachedValue>, u64) {
        let mut state = self.lock_state();
        let generation = state.generation;
        (state.entries.get(key).cloned(), generation)
    }

    fn put(&self, key: LookupKey, value: CachedValue, generation: u64) {
        let mut state = self.lock_state();
        if state.generation == generation {
            if !state.entries.contains(&key) && state.entries.len() == state.entries.cap().get() {
                trace!("Catalog cache full, evicting least recently used lookup");
            }
            state.entries.put(key, value);
        } else {
            debug!("Discarding lookup result from stale cache generation {generation}");
        }
    }
}

#[async_trait]
impl<C: IngredientCatalog> IngredientCatalog for CachedCatalog<C> {
    async fn find_exact(&self, name: &str) -> StoreResult<Option<IngredientRecord>> {
        let key = LookupKey::Exact(name.trim().to_lowercase());
        let (cached, generation) = self.get(&key);
        if let Some(CachedValue::One(record)) = cached {
            return Ok(record);
        }

        let record = self.inner.find_exact(name).await?;
        self.put(key, CachedValue::One(record.clone()), generation);
        Ok(record)
    }

    async fn find_containing(
        &self,
        fragment: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        let key = LookupKey::Containing(fragment.trim().to_lowercase(), limit);
        let (cached, generation) = self.get(&key);
        if let Some(CachedValue::Many(records)) = cached {
            return Ok(records);
        }

        let records = self.inner.find_containing(fragment, limit).await?;
        self.put(key, CachedValue::Many(records.clone()), generation);
        Ok(records)
    }

    async fn find_contained_in(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        let key = LookupKey::ContainedIn(text.trim().to_lowercase(), limit);
        let (cached, generation) = self.get(&key);
        if let Some(CachedValue::Many(records)) = cached {
            return Ok(records);
        }

        let records = self.inner.find_contained_in(text, limit).await?;
        self.put(key, CachedValue::Many(records.clone()), generation);
        Ok(records)
    }
}
