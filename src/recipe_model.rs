//! # Catalog and Recipe Data Model
//!
//! Records owned by the ingredient catalog and the recipe store. Both are
//! read-only from the point of view of the matching and ranking code.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use receipt_recipes::recipe_model::RecipeRecord;
//!
//! let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
//! let recipe = RecipeRecord::new(1, "사과 스무디", created_at)
//!     .with_ingredient_blob("사과|우유|꿀")
//!     .with_views(120);
//!
//! assert_eq!(recipe.ingredients, vec!["사과", "우유", "꿀"]);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An entry of the controlled ingredient vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    /// Stable identifier
    pub id: i64,
    /// Canonical display name, unique within the catalog
    pub name: String,
    /// Optional classification, used for diagnostics only
    pub category: Option<String>,
}

impl IngredientRecord {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: None,
        }
    }

    /// Add a category tag to this ingredient
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// A recipe together with its ingredient membership and popularity counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: i64,
    pub title: String,
    /// Ingredient names referenced by the recipe, unique and trimmed
    pub ingredients: Vec<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

impl RecipeRecord {
    /// Create a recipe with no ingredients and zeroed counters
    pub fn new(id: i64, title: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.to_string(),
            ingredients: Vec::new(),
            view_count: 0,
            like_count: 0,
            created_at,
        }
    }

    /// Set the ingredients from a pipe- or newline-separated blob
    pub fn with_ingredient_blob(mut self, blob: &str) -> Self {
        self.ingredients = parse_ingredient_blob(blob);
        self
    }

    /// Set the ingredients from a list of names
    pub fn with_ingredients<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blob = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.ingredients = parse_ingredient_blob(&blob);
        self
    }

    pub fn with_views(mut self, view_count: i64) -> Self {
        self.view_count = view_count;
        self
    }

    pub fn with_likes(mut self, like_count: i64) -> Self {
        self.like_count = like_count;
        self
    }

    /// Ingredients joined into the pipe-separated form stored in the database
    pub fn ingredient_blob(&self) -> String {
        self.ingredients.join("|")
    }
}

/// Split an ingredient blob on `|` and line breaks
///
/// Entries are trimmed, empty entries dropped and repeated names kept once, in
/// first-seen order.
pub fn parse_ingredient_blob(blob: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    blob.split(|c: char| c == '|' || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_pipe_separated_blob() {
        assert_eq!(
            parse_ingredient_blob("사과| 우유 |꿀"),
            vec!["사과", "우유", "꿀"]
        );
    }

    #[test]
    fn test_parse_row_separated_blob() {
        assert_eq!(
            parse_ingredient_blob("사과\r\n우유\n\n꿀|"),
            vec!["사과", "우유", "꿀"]
        );
    }

    #[test]
    fn test_parse_blob_drops_repeats() {
        assert_eq!(parse_ingredient_blob("사과|사과|우유"), vec!["사과", "우유"]);
        assert!(parse_ingredient_blob(" | \n ").is_empty());
    }

    #[test]
    fn test_recipe_builder() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let recipe = RecipeRecord::new(7, "계란말이", created_at)
            .with_ingredients(["계란", "대파", "계란"])
            .with_views(10)
            .with_likes(3);

        assert_eq!(recipe.ingredients, vec!["계란", "대파"]);
        assert_eq!(recipe.ingredient_blob(), "계란|대파");
        assert_eq!(recipe.view_count, 10);
        assert_eq!(recipe.like_count, 3);
    }

    #[test]
    fn test_ingredient_record_category() {
        let record = IngredientRecord::new(1, "사과").with_category("과일");
        assert_eq!(record.category.as_deref(), Some("과일"));
    }
}
