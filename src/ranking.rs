//! # Ranking Module
//!
//! Scored recipe search. A recipe's main score is the number of its distinct
//! ingredients found in the main set, its sub score the number found in the
//! sub set. Recipes scoring zero on both are never returned.
//!
//! Results are ordered by main score, sub score, the caller's sort field,
//! creation time and finally recipe id, all descending. The full ordering is
//! deterministic, so successive pages over an unchanged data set never overlap
//! or skip a recipe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::errors::{FinderError, FinderResult};
use crate::recipe_model::RecipeRecord;
use crate::store::RecipeStore;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 50;

/// Secondary ordering applied after the match scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest recipes first
    #[default]
    Latest,
    /// Most viewed recipes first
    Views,
    /// Most liked recipes first
    Likes,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Latest => "latest",
            SortKey::Views => "views",
            SortKey::Likes => "likes",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(SortKey::Latest),
            "views" => Ok(SortKey::Views),
            "likes" => Ok(SortKey::Likes),
            other => Err(FinderError::Validation(format!(
                "unknown sort key '{other}', expected one of: latest, views, likes"
            ))),
        }
    }
}

/// A recipe search as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub main_ingredients: Vec<String>,
    #[serde(default)]
    pub sub_ingredients: Vec<String>,
    #[serde(default)]
    pub sort_key: SortKey,
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl SearchRequest {
    /// First page of recipes for the given main ingredients, newest first
    pub fn new<I, S>(main_ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            main_ingredients: main_ingredients.into_iter().map(Into::into).collect(),
            sub_ingredients: Vec::new(),
            sort_key: SortKey::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    pub fn with_sub_ingredients<I, S>(mut self, sub_ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_ingredients = sub_ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn sorted_by(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Validate the request and turn it into a store query
    ///
    /// Returns `Ok(None)` when the main set is empty after dropping blank
    /// names: that request has an empty answer and needs no store access.
    pub fn to_query(&self, max_page_size: usize) -> FinderResult<Option<RankQuery>> {
        if self.limit == 0 {
            return Err(FinderError::Validation(
                "limit must be greater than 0".to_string(),
            ));
        }
        if self.limit > max_page_size {
            return Err(FinderError::Validation(format!(
                "limit {} exceeds the maximum page size of {}",
                self.limit, max_page_size
            )));
        }
        if i64::try_from(self.offset).is_err() {
            return Err(FinderError::Validation(format!(
                "offset {} is out of range",
                self.offset
            )));
        }

        let main = normalize_ingredient_set(&self.main_ingredients);
        if main.is_empty() {
            return Ok(None);
        }

        Ok(Some(RankQuery {
            main,
            sub: normalize_ingredient_set(&self.sub_ingredients),
            sort_key: self.sort_key,
            limit: self.limit,
            offset: self.offset,
        }))
    }
}

/// A validated search handed to a [`RecipeStore`]
///
/// `main` is never empty; both sets are trimmed and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankQuery {
    pub main: Vec<String>,
    pub sub: Vec<String>,
    pub sort_key: SortKey,
    pub limit: usize,
    pub offset: usize,
}

/// One ranked recipe with its match scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecipe {
    pub recipe_id: i64,
    pub title: String,
    /// Distinct recipe ingredients present in the main set
    pub main_score: i64,
    /// Distinct recipe ingredients present in the sub set
    pub sub_score: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A window of ranked recipes plus the number of qualifying recipes overall
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<RankedRecipe>,
    pub total_count: u64,
}

impl Page {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Trim names, drop blanks and repeated names, keeping first-seen order
pub fn normalize_ingredient_set(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Total order used for ranked results
pub fn compare_ranked(a: &RankedRecipe, b: &RankedRecipe, sort_key: SortKey) -> Ordering {
    let by_sort_key = match sort_key {
        SortKey::Latest => b.created_at.cmp(&a.created_at),
        SortKey::Views => b.view_count.cmp(&a.view_count),
        SortKey::Likes => b.like_count.cmp(&a.like_count),
    };

    b.main_score
        .cmp(&a.main_score)
        .then_with(|| b.sub_score.cmp(&a.sub_score))
        .then(by_sort_key)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.recipe_id.cmp(&a.recipe_id))
}

/// Score, order and window recipes in memory
///
/// This is the reference implementation of the ranking contract; any
/// [`RecipeStore`] must produce the same page for the same data.
pub fn rank_recipes<'a, I>(recipes: I, query: &RankQuery) -> Page
where
    I: IntoIterator<Item = &'a RecipeRecord>,
{
    let main: HashSet<&str> = query.main.iter().map(String::as_str).collect();
    let sub: HashSet<&str> = query.sub.iter().map(String::as_str).collect();

    let mut hits: Vec<RankedRecipe> = recipes
        .into_iter()
        .filter_map(|recipe| {
            let ingredients: HashSet<&str> =
                recipe.ingredients.iter().map(|i| i.trim()).collect();
            let main_score = ingredients.iter().filter(|i| main.contains(*i)).count() as i64;
            let sub_score = ingredients.iter().filter(|i| sub.contains(*i)).count() as i64;

            if main_score == 0 && sub_score == 0 {
                return None;
            }

            Some(RankedRecipe {
                recipe_id: recipe.id,
                title: recipe.title.clone(),
                main_score,
                sub_score,
                view_count: recipe.view_count,
                like_count: recipe.like_count,
                created_at: recipe.created_at,
            })
        })
        .collect();

    hits.sort_by(|a, b| compare_ranked(a, b, query.sort_key));

    let total_count = hits.len() as u64;
    let items = hits
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Page { items, total_count }
}

/// Validates search requests and runs them against a [`RecipeStore`]
pub struct RankingEngine<R> {
    store: R,
    max_page_size: usize,
}

impl<R: RecipeStore> RankingEngine<R> {
    pub fn new(store: R) -> Self {
        Self::with_max_page_size(store, DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn with_max_page_size(store: R, max_page_size: usize) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Run a ranked search
    ///
    /// # Errors
    ///
    /// - [`FinderError::Validation`] for a zero or oversized limit, before the
    ///   store is touched. Oversized limits are rejected, not clamped.
    /// - [`FinderError::Search`] when the store fails; no partial page is returned.
    pub async fn search(&self, request: &SearchRequest) -> FinderResult<Page> {
        let query = match request.to_query(self.max_page_size)? {
            Some(query) => query,
            None => {
                debug!("Empty main ingredient set, skipping recipe store");
                return Ok(Page::empty());
            }
        };

        let page = self.store.search_ranked(&query).await.map_err(|e| {
            warn!(error = %e, sort_key = %query.sort_key, "Recipe search failed");
            FinderError::Search(e)
        })?;

        info!(
            main = query.main.len(),
            sub = query.sub.len(),
            sort_key = %query.sort_key,
            offset = query.offset,
            returned = page.items.len(),
            total = page.total_count,
            "Ranked recipe search completed"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    fn query(main: &[&str], sub: &[&str], sort_key: SortKey) -> RankQuery {
        RankQuery {
            main: main.iter().map(|s| s.to_string()).collect(),
            sub: sub.iter().map(|s| s.to_string()).collect(),
            sort_key,
            limit: 10,
            offset: 0,
        }
    }

    fn ids(page: &Page) -> Vec<i64> {
        page.items.iter().map(|r| r.recipe_id).collect()
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("latest".parse::<SortKey>().unwrap(), SortKey::Latest);
        assert_eq!(" Views ".parse::<SortKey>().unwrap(), SortKey::Views);
        assert_eq!("LIKES".parse::<SortKey>().unwrap(), SortKey::Likes);
        assert!(matches!(
            "popular".parse::<SortKey>(),
            Err(FinderError::Validation(_))
        ));
    }

    #[test]
    fn test_main_score_dominates_sub_score() {
        let recipes = vec![
            RecipeRecord::new(1, "a", at(1)).with_ingredients(["사과", "꿀", "우유"]),
            RecipeRecord::new(2, "b", at(2)).with_ingredients(["사과", "배"]),
            RecipeRecord::new(3, "c", at(3)).with_ingredients(["꿀", "우유"]),
        ];
        let page = rank_recipes(&recipes, &query(&["사과", "배"], &["꿀", "우유"], SortKey::Latest));

        // 2 has two main hits; 1 has one main and two sub; 3 only sub hits
        assert_eq!(ids(&page), vec![2, 1, 3]);
        assert_eq!(page.items[1].main_score, 1);
        assert_eq!(page.items[1].sub_score, 2);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_zero_score_recipes_are_dropped() {
        let recipes = vec![
            RecipeRecord::new(1, "a", at(1)).with_ingredients(["감자"]),
            RecipeRecord::new(2, "b", at(2)).with_ingredients(["사과"]),
        ];
        let page = rank_recipes(&recipes, &query(&["사과"], &[], SortKey::Latest));
        assert_eq!(ids(&page), vec![2]);
        assert!(page
            .items
            .iter()
            .all(|r| r.main_score > 0 || r.sub_score > 0));
    }

    #[test]
    fn test_sort_key_breaks_score_ties() {
        let recipes = vec![
            RecipeRecord::new(1, "a", at(3)).with_ingredients(["사과"]).with_views(5).with_likes(50),
            RecipeRecord::new(2, "b", at(1)).with_ingredients(["사과"]).with_views(50).with_likes(5),
            RecipeRecord::new(3, "c", at(2)).with_ingredients(["사과"]).with_views(20).with_likes(20),
        ];

        let by_latest = rank_recipes(&recipes, &query(&["사과"], &[], SortKey::Latest));
        assert_eq!(ids(&by_latest), vec![1, 3, 2]);

        let by_views = rank_recipes(&recipes, &query(&["사과"], &[], SortKey::Views));
        assert_eq!(ids(&by_views), vec![2, 3, 1]);

        let by_likes = rank_recipes(&recipes, &query(&["사과"], &[], SortKey::Likes));
        assert_eq!(ids(&by_likes), vec![1, 3, 2]);
    }

    #[test]
    fn test_created_at_then_id_break_remaining_ties() {
        let recipes = vec![
            RecipeRecord::new(1, "a", at(1)).with_ingredients(["사과"]).with_views(7),
            RecipeRecord::new(2, "b", at(2)).with_ingredients(["사과"]).with_views(7),
            RecipeRecord::new(3, "c", at(2)).with_ingredients(["사과"]).with_views(7),
        ];
        let page = rank_recipes(&recipes, &query(&["사과"], &[], SortKey::Views));
        assert_eq!(ids(&page), vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_recipe_ingredients_count_once() {
        let mut recipe = RecipeRecord::new(1, "a", at(1));
        recipe.ingredients = vec!["사과".to_string(), " 사과 ".to_string()];
        let page = rank_recipes(&[recipe], &query(&["사과"], &[], SortKey::Latest));
        assert_eq!(page.items[0].main_score, 1);
    }

    #[test]
    fn test_window_and_total_count() {
        let recipes: Vec<RecipeRecord> = (1..=5)
            .map(|id| RecipeRecord::new(id, "r", at(id as u32)).with_ingredients(["사과"]))
            .collect();
        let mut q = query(&["사과"], &[], SortKey::Latest);
        q.limit = 2;
        q.offset = 2;

        let page = rank_recipes(&recipes, &q);
        assert_eq!(ids(&page), vec![3, 2]);
        assert_eq!(page.total_count, 5);

        q.offset = 10;
        let page = rank_recipes(&recipes, &q);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 5);
    }

    #[test]
    fn test_request_validation() {
        let request = SearchRequest::new(["사과"]).page(0, 0);
        assert!(matches!(request.to_query(50), Err(FinderError::Validation(_))));

        let request = SearchRequest::new(["사과"]).page(51, 0);
        assert!(matches!(request.to_query(50), Err(FinderError::Validation(_))));

        let request = SearchRequest::new(["사과"]).page(50, 0);
        assert!(request.to_query(50).unwrap().is_some());
    }

    #[test]
    fn test_request_with_blank_main_set_has_no_query() {
        let request = SearchRequest::new(["", "  "]);
        assert_eq!(request.to_query(50).unwrap(), None);
    }

    #[test]
    fn test_normalize_ingredient_set() {
        let names = vec![
            " 사과".to_string(),
            "우유".to_string(),
            "사과 ".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_ingredient_set(&names), vec!["사과", "우유"]);
    }
}
