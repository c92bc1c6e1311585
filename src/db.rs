//! # Postgres Store Module
//!
//! Schema management and the Postgres implementation of both store traits.
//!
//! Recipes keep their ingredients as a single text blob separated by `|` or
//! newlines. Scoring splits and trims the blob in SQL, so the database does
//! the counting and only the requested page travels back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::errors::{StoreError, StoreResult};
use crate::ranking::{Page, RankQuery, RankedRecipe, SortKey};
use crate::recipe_model::{IngredientRecord, RecipeRecord};
use crate::store::{IngredientCatalog, RecipeStore};

/// Connect a pool sized from the configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.query_timeout)
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.max_connections,
        "Connected to Postgres"
    );
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ingredients (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            category TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create ingredients table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS ingredients_lower_name_idx ON ingredients (lower(name))")
        .execute(pool)
        .await
        .context("Failed to create ingredients name index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            ingredients TEXT NOT NULL DEFAULT '',
            view_count BIGINT NOT NULL DEFAULT 0,
            like_count BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Insert an ingredient, returning the stored record
pub async fn insert_ingredient(
    pool: &PgPool,
    name: &str,
    category: Option<&str>,
) -> Result<IngredientRecord> {
    let row = sqlx::query(
        "INSERT INTO ingredients (name, category) VALUES ($1, $2) RETURNING id, name, category",
    )
    .bind(name.trim())
    .bind(category)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to insert ingredient '{}'", name))?;

    Ok(ingredient_from_row(&row)?)
}

/// Insert a recipe and return its new id; the record's own id is ignored
pub async fn insert_recipe(pool: &PgPool, recipe: &RecipeRecord) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO recipes (title, ingredients, view_count, like_count, created_at)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&recipe.title)
    .bind(recipe.ingredient_blob())
    .bind(recipe.view_count)
    .bind(recipe.like_count)
    .bind(recipe.created_at)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to insert recipe '{}'", recipe.title))?;

    let id: i64 = row.try_get("id")?;
    debug!("Inserted recipe {} with id {}", recipe.title, id);
    Ok(id)
}

fn ingredient_from_row(row: &PgRow) -> Result<IngredientRecord, sqlx::Error> {
    Ok(IngredientRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
    })
}

fn ranked_from_row(row: &PgRow) -> Result<RankedRecipe, sqlx::Error> {
    Ok(RankedRecipe {
        recipe_id: row.try_get("id")?,
        title: row.try_get("title")?,
        main_score: row.try_get("main_score")?,
        sub_score: row.try_get("sub_score")?,
        view_count: row.try_get("view_count")?,
        like_count: row.try_get("like_count")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Code point ranges of Unicode `White_Space`, the set `str::trim` strips
const WHITESPACE_RANGES: &[(u32, u32)] = &[
    (0x0009, 0x000D),
    (0x0020, 0x0020),
    (0x0085, 0x0085),
    (0x00A0, 0x00A0),
    (0x1680, 0x1680),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
];

/// Postgres bracket expression matching one whitespace character
fn whitespace_class() -> String {
    let mut class = String::from("[");
    for &(start, end) in WHITESPACE_RANGES {
        if start == end {
            class.push_str(&format!("\\u{start:04X}"));
        } else {
            class.push_str(&format!("\\u{start:04X}-\\u{end:04X}"));
        }
    }
    class.push(']');
    class
}

lazy_static! {
    // $1 = main set, $2 = sub set; items are trimmed like str::trim
    static ref SCORED_RECIPES: String = {
        let ws = whitespace_class();
        let items = format!(
            r"SELECT DISTINCT regexp_replace(part, '^{ws}+|{ws}+$', '', 'g') AS item
               FROM regexp_split_to_table(r.ingredients, '[|\n\r]') AS part"
        );
        format!(
            r"WITH scored AS (
                SELECT r.id, r.title, r.view_count, r.like_count, r.created_at,
                    (SELECT COUNT(*) FROM ({items}) AS items
                      WHERE item = ANY($1)) AS main_score,
                    (SELECT COUNT(*) FROM ({items}) AS items
                      WHERE item = ANY($2)) AS sub_score
                FROM recipes r
            )"
        )
    };
}

fn sort_column(sort_key: SortKey) -> &'static str {
    match sort_key {
        SortKey::Latest => "created_at",
        SortKey::Views => "view_count",
        SortKey::Likes => "like_count",
    }
}

fn page_sql(sort_key: SortKey) -> String {
    format!(
        "{}
        SELECT id, title, main_score, sub_score, view_count, like_count, created_at
        FROM scored
        WHERE main_score > 0 OR sub_score > 0
        ORDER BY main_score DESC, sub_score DESC, {} DESC, created_at DESC, id DESC
        LIMIT $3 OFFSET $4",
        *SCORED_RECIPES,
        sort_column(sort_key)
    )
}

fn count_sql() -> String {
    format!(
        "{} SELECT COUNT(*) AS total FROM scored WHERE main_score > 0 OR sub_score > 0",
        *SCORED_RECIPES
    )
}

/// Postgres-backed ingredient catalog and recipe store
///
/// Every call is bounded by the configured query timeout.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Connect a new pool and wrap it
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = connect(config).await?;
        Ok(Self::new(pool, config.query_timeout))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Database call failed");
                Err(StoreError::Database(e))
            }
            Err(_) => {
                warn!(operation, timeout = ?self.query_timeout, "Database call timed out");
                Err(StoreError::Timeout(self.query_timeout))
            }
        }
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl IngredientCatalog for PgStore {
    async fn find_exact(&self, name: &str) -> StoreResult<Option<IngredientRecord>> {
        let name = name.trim();
        self.bounded("find_exact", async {
            let row = sqlx::query(
                "SELECT id, name, category FROM ingredients
                 WHERE lower(name) = lower($1)
                 ORDER BY id
                 LIMIT 1",
            )
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
            row.as_ref().map(ingredient_from_row).transpose()
        })
        .await
    }

    async fn find_containing(
        &self,
        fragment: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        self.bounded("find_containing", async {
            let rows = sqlx::query(
                r#"SELECT id, name, category FROM ingredients
                   WHERE strpos(lower(name), lower($1)) > 0
                   ORDER BY char_length(name), name COLLATE "C", id
                   LIMIT $2"#,
            )
            .bind(fragment)
            .bind(to_sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
            rows.iter()
                .map(ingredient_from_row)
                .collect::<Result<Vec<_>, sqlx::Error>>()
        })
        .await
    }

    async fn find_contained_in(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<IngredientRecord>> {
        let text = text.trim();
        self.bounded("find_contained_in", async {
            let rows = sqlx::query(
                r#"SELECT id, name, category FROM ingredients
                   WHERE name <> '' AND strpos(lower($1), lower(name)) > 0
                   ORDER BY char_length(name) DESC, name COLLATE "C", id
                   LIMIT $2"#,
            )
            .bind(text)
            .bind(to_sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
            rows.iter()
                .map(ingredient_from_row)
                .collect::<Result<Vec<_>, sqlx::Error>>()
        })
        .await
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn search_ranked(&self, query: &RankQuery) -> StoreResult<Page> {
        let page_sql = page_sql(query.sort_key);
        let count_sql = count_sql();

        self.bounded("search_ranked", async {
            // Count and page must see the same snapshot
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;

            let total: i64 = sqlx::query(&count_sql)
                .bind(&query.main[..])
                .bind(&query.sub[..])
                .fetch_one(&mut *tx)
                .await?
                .try_get("total")?;

            let rows = sqlx::query(&page_sql)
                .bind(&query.main[..])
                .bind(&query.sub[..])
                .bind(to_sql_limit(query.limit))
                .bind(to_sql_limit(query.offset))
                .fetch_all(&mut *tx)
                .await?;
            tx.commit().await?;

            let items = rows
                .iter()
                .map(ranked_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, sqlx::Error>(Page {
                items,
                total_count: u64::try_from(total).unwrap_or(0),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sql_uses_sort_column() {
        assert!(page_sql(SortKey::Views).contains("sub_score DESC, view_count DESC, created_at DESC, id DESC"));
        assert!(page_sql(SortKey::Likes).contains("like_count DESC"));
        assert!(page_sql(SortKey::Latest).contains("sub_score DESC, created_at DESC, created_at DESC"));
    }

    #[test]
    fn test_count_sql_filters_zero_scores() {
        let sql = count_sql();
        assert!(sql.contains("COUNT(*) AS total"));
        assert!(sql.contains("WHERE main_score > 0 OR sub_score > 0"));
    }

    #[test]
    fn test_whitespace_ranges_match_str_trim() {
        for c in (0..=0x10FFFFu32).filter_map(char::from_u32) {
            let code = c as u32;
            let listed = WHITESPACE_RANGES
                .iter()
                .any(|&(start, end)| (start..=end).contains(&code));
            assert_eq!(listed, c.is_whitespace(), "U+{code:04X}");
        }
    }

    #[test]
    fn test_scoring_trims_unicode_whitespace() {
        let class = whitespace_class();
        assert!(class.starts_with("[\\u0009-\\u000D\\u0020"));
        assert!(class.ends_with("\\u3000]"));
        assert!(SCORED_RECIPES.contains(&format!("'^{class}+|{class}+$'")));
        assert!(!SCORED_RECIPES.contains("btrim"));
    }

    #[tokio::test]
    async fn test_slow_calls_time_out() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let store = PgStore::new(pool, Duration::from_millis(10));

        let result = store
            .bounded("pending", std::future::pending::<Result<(), sqlx::Error>>())
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn test_to_sql_limit_saturates() {
        assert_eq!(to_sql_limit(10), 10);
        assert_eq!(to_sql_limit(usize::MAX), i64::MAX);
    }
}
