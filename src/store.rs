//! # Store Collaborator Traits
//!
//! The ingredient catalog and the recipe store are external collaborators.
//! These traits are the whole contract the pipeline relies on; Postgres and
//! in-memory implementations live in [`crate::db`] and [`crate::memory_store`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::StoreResult;
use crate::ranking::{Page, RankQuery};
use crate::recipe_model::IngredientRecord;

/// Read-only lookups against the controlled ingredient vocabulary
#[async_trait]
pub trait IngredientCatalog: Send + Sync {
    /// Case-insensitive exact lookup by name
    async fn find_exact(&self, name: &str) -> StoreResult<Option<IngredientRecord>>;

    /// Entries whose name contains `fragment` (case-insensitive), shortest
    /// names first, at most `limit` rows
    async fn find_containing(
        &self,
        fragment: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>>;

    /// Entries whose name occurs inside `text` (case-insensitive), longest
    /// names first, at most `limit` rows
    async fn find_contained_in(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>>;
}

/// Scored recipe search
///
/// Implementations must follow the ordering and counting rules documented on
/// [`crate::ranking::rank_recipes`], which is the reference implementation.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn search_ranked(&self, query: &RankQuery) -> StoreResult<Page>;
}

#[async_trait]
impl<T: IngredientCatalog + ?Sized> IngredientCatalog for Arc<T> {
    async fn find_exact(&self, name: &str) -> StoreResult<Option<IngredientRecord>> {
        (**self).find_exact(name).await
    }

    async fn find_containing(
        &self,
        fragment: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        (**self).find_containing(fragment, limit).await
    }

    async fn find_contained_in(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        (**self).find_contained_in(text, limit).await
    }
}

#[async_trait]
impl<T: RecipeStore + ?Sized> RecipeStore for Arc<T> {
    async fn search_ranked(&self, query: &RankQuery) -> StoreResult<Page> {
        (**self).search_ranked(query).await
    }
}
