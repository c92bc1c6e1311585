//! # Recipe Finder Pipeline
//!
//! Ties the stages together: receipt text is normalized into candidates,
//! filtered, resolved against the ingredient catalog and finally used as the
//! main ingredient set of a ranked recipe search.
//!
//! ## Error staging
//!
//! - Bad requests fail with [`FinderError::Validation`] before any store call.
//! - Catalog failures surface as [`FinderError::Extraction`].
//! - Recipe store failures surface as [`FinderError::Search`].
//!
//! No stage returns partial results on failure.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::candidate_filter::CandidateFilter;
use crate::config::AppConfig;
use crate::errors::{FinderError, FinderResult};
use crate::extraction_config::ExtractionConfig;
use crate::ingredient_matcher::IngredientMatcher;
use crate::ranking::{Page, RankingEngine, SearchRequest, DEFAULT_MAX_PAGE_SIZE};
use crate::store::{IngredientCatalog, RecipeStore};
use crate::text_processing::{Candidate, TextNormalizer};

/// Ingredients read from a receipt together with the recipes they led to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptSearch {
    /// Catalog names extracted from the receipt, in first-seen order
    pub extracted: Vec<String>,
    /// The main ingredient set actually searched with
    pub main_ingredients: Vec<String>,
    pub page: Page,
}

/// Receipt-to-recipe pipeline over an ingredient catalog and a recipe store
pub struct RecipeFinder<C, R> {
    normalizer: TextNormalizer,
    filter: CandidateFilter,
    matcher: IngredientMatcher<C>,
    ranking: RankingEngine<R>,
}

impl<C, R> RecipeFinder<C, R>
where
    C: IngredientCatalog,
    R: RecipeStore,
{
    /// Create a finder with the default vocabulary and page size limit
    pub fn new(catalog: C, recipes: R) -> FinderResult<Self> {
        Self::with_config(catalog, recipes, &ExtractionConfig::default(), DEFAULT_MAX_PAGE_SIZE)
    }

    /// Create a finder from an extraction configuration and a page size limit
    pub fn with_config(
        catalog: C,
        recipes: R,
        extraction: &ExtractionConfig,
        max_page_size: usize,
    ) -> FinderResult<Self> {
        if max_page_size == 0 {
            return Err(FinderError::Validation(
                "max page size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            normalizer: TextNormalizer::with_config(extraction)?,
            filter: CandidateFilter::with_config(extraction)?,
            matcher: IngredientMatcher::with_window(catalog, extraction.partial_match_window)
                .with_min_partial_length(extraction.min_length),
            ranking: RankingEngine::with_max_page_size(recipes, max_page_size),
        })
    }

    /// Create a finder from the application configuration
    pub fn from_app_config(catalog: C, recipes: R, config: &AppConfig) -> FinderResult<Self> {
        Self::with_config(catalog, recipes, &config.extraction, config.max_page_size)
    }

    pub fn catalog(&self) -> &C {
        self.matcher.catalog()
    }

    /// Plausible, unique candidates for a receipt, without touching any store
    pub fn candidates(&self, raw_text: &str) -> Vec<Candidate> {
        let raw_candidates = self.normalizer.extract_candidates(raw_text);
        self.filter.filter_candidates(raw_candidates)
    }

    /// Extract the catalog ingredient names mentioned in receipt text
    ///
    /// The result holds unique catalog names in the order their candidates
    /// first appear. Blank text yields an empty list without any catalog call.
    ///
    /// # Errors
    ///
    /// [`FinderError::Extraction`] when a catalog lookup fails.
    #[instrument(skip_all, fields(chars = raw_text.chars().count()))]
    pub async fn extract_ingredients(&self, raw_text: &str) -> FinderResult<Vec<String>> {
        let candidates = self.candidates(raw_text);
        if candidates.is_empty() {
            debug!("No plausible candidates in receipt text");
            return Ok(Vec::new());
        }

        let names = self
            .matcher
            .match_candidates(&candidates)
            .await
            .map_err(|e| {
                warn!(error = %e, "Ingredient extraction failed");
                FinderError::Extraction(e)
            })?;

        info!(
            candidates = candidates.len(),
            ingredients = names.len(),
            "Extracted ingredients from receipt"
        );
        Ok(names)
    }

    /// Run a ranked recipe search
    pub async fn search_recipes(&self, request: &SearchRequest) -> FinderResult<Page> {
        self.ranking.search(request).await
    }

    /// Extract ingredients from a receipt and search recipes with them
    ///
    /// The extracted names come first in the main set, followed by the
    /// request's own main ingredients. The request is validated before any
    /// store is touched.
    #[instrument(skip_all, fields(sort_key = %request.sort_key, limit = request.limit, offset = request.offset))]
    pub async fn find_recipes_for_receipt(
        &self,
        raw_text: &str,
        request: SearchRequest,
    ) -> FinderResult<ReceiptSearch> {
        // Validation only; the real query is built from the merged main set
        request.to_query(self.ranking.max_page_size())?;

        let extracted = self.extract_ingredients(raw_text).await?;

        let mut merged = request;
        let user_main = std::mem::take(&mut merged.main_ingredients);
        merged.main_ingredients = extracted.iter().cloned().chain(user_main).collect();

        let page = self.ranking.search(&merged).await?;
        let main_ingredients = crate::ranking::normalize_ingredient_set(&merged.main_ingredients);

        Ok(ReceiptSearch {
            extracted,
            main_ingredients,
            page,
        })
    }
}
