//! # In-Memory Stores
//!
//! Catalog and recipe store implementations backed by plain vectors. They
//! follow the same lookup and ranking rules as the Postgres store and count
//! the calls they receive, which makes them handy for tests and for small
//! embedded catalogs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::errors::{StoreError, StoreResult};
use crate::ranking::{rank_recipes, Page, RankQuery};
use crate::recipe_model::{IngredientRecord, RecipeRecord};
use crate::store::{IngredientCatalog, RecipeStore};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ingredient catalog held in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<IngredientRecord>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from names, assigning ids 1, 2, 3, ...
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let catalog = Self::new();
        for name in names {
            catalog.insert(name.as_ref(), None);
        }
        catalog
    }

    /// Build a catalog from records that already carry ids and categories
    pub fn from_records(records: Vec<IngredientRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Default::default()
        }
    }

    /// Add an ingredient and return the stored record
    pub fn insert(&self, name: &str, category: Option<&str>) -> IngredientRecord {
        let mut records = write(&self.records);
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = IngredientRecord {
            id,
            name: name.trim().to_string(),
            category: category.map(str::to_string),
        };
        records.push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        read(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups received so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make every following lookup fail, simulating an unreachable store
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn begin_lookup(&self) -> StoreResult<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory catalog is offline".to_string(),
            ));
        }
        Ok(())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[async_trait]
impl IngredientCatalog for InMemoryCatalog {
    async fn find_exact(&self, name: &str) -> StoreResult<Option<IngredientRecord>> {
        self.begin_lookup()?;
        let wanted = name.trim().to_lowercase();
        let records = read(&self.records);
        Ok(records
            .iter()
            .filter(|r| r.name.to_lowercase() == wanted)
            .min_by_key(|r| r.id)
            .cloned())
    }

    async fn find_containing(
        &self,
        fragment: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        self.begin_lookup()?;
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let records = read(&self.records);
        let mut hits: Vec<IngredientRecord> = records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&fragment))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            char_len(&a.name)
                .cmp(&char_len(&b.name))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_contained_in(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        self.begin_lookup()?;
        let text = text.trim().to_lowercase();

        let records = read(&self.records);
        let mut hits: Vec<IngredientRecord> = records
            .iter()
            .filter(|r| {
                let name = r.name.to_lowercase();
                !name.is_empty() && text.contains(&name)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            char_len(&b.name)
                .cmp(&char_len(&a.name))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Recipe store held in memory, ranked with [`rank_recipes`]
#[derive(Debug, Default)]
pub struct InMemoryRecipeStore {
    recipes: RwLock<Vec<RecipeRecord>>,
    queries: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryRecipeStore {
    pub fn new(recipes: Vec<RecipeRecord>) -> Self {
        Self {
            recipes: RwLock::new(recipes),
            ..Default::default()
        }
    }

    pub fn insert(&self, recipe: RecipeRecord) {
        write(&self.recipes).push(recipe);
    }

    /// Number of ranked searches received so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make every following search fail, simulating an unreachable store
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    async fn search_ranked(&self, query: &RankQuery) -> StoreResult<Page> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory recipe store is offline".to_string(),
            ));
        }

        let recipes = read(&self.recipes);
        let page = rank_recipes(recipes.iter(), query);
        debug!(
            scanned = recipes.len(),
            total = page.total_count,
            "Ranked in-memory recipes"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_exact_is_case_insensitive() {
        let catalog = InMemoryCatalog::from_names(["Tofu", "사과"]);
        let record = catalog.find_exact("tofu").await.unwrap().unwrap();
        assert_eq!(record.name, "Tofu");
        assert_eq!(record.id, 1);
        assert!(catalog.find_exact("두부").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_containing_orders_shortest_first() {
        let catalog = InMemoryCatalog::from_names(["딸기우유", "우유", "바나나우유", "두유"]);
        let hits = catalog.find_containing("우유", 2).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["우유", "딸기우유"]);
    }

    #[tokio::test]
    async fn test_find_contained_in_orders_longest_first() {
        let catalog = InMemoryCatalog::from_names(["우유", "유", "서울우유", "치즈"]);
        let hits = catalog.find_contained_in("서울우유 1L", 3).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["서울우유", "우유", "유"]);
    }

    #[tokio::test]
    async fn test_unavailable_catalog_fails() {
        let catalog = InMemoryCatalog::from_names(["사과"]);
        catalog.set_unavailable(true);
        assert!(matches!(
            catalog.find_exact("사과").await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(catalog.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() {
        let catalog = InMemoryCatalog::from_names(["사과"]);
        let record = catalog.insert(" 우유 ", Some("유제품"));
        assert_eq!(record.id, 2);
        assert_eq!(record.name, "우유");
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_from_records_keeps_ids_and_categories() {
        let catalog = InMemoryCatalog::from_records(vec![
            IngredientRecord::new(10, "우유").with_category("유제품"),
            IngredientRecord::new(7, "사과").with_category("과일"),
        ]);
        let record = catalog.find_exact("우유").await.unwrap().unwrap();
        assert_eq!(record.id, 10);
        assert_eq!(record.category.as_deref(), Some("유제품"));

        // New ids continue after the largest existing one
        assert_eq!(catalog.insert("두부", None).id, 11);
        assert_eq!(catalog.len(), 3);
    }
}
