//! # Ingredient Matcher Module
//!
//! Resolves filtered candidates against the ingredient catalog.
//!
//! Each candidate costs at most three catalog round-trips: an exact lookup,
//! then, if that misses, one "catalog name contains candidate" lookup and one
//! "candidate contains catalog name" lookup, each capped to a small window.
//!
//! Catalog names found inside a candidate must be at least `min_partial_length`
//! characters long, so one-syllable names such as "무" do not match every
//! candidate that happens to contain them.
//!
//! When several catalog names satisfy the substring relation, the name whose
//! length is closest to the candidate wins; remaining ties go to the
//! lexicographically smaller name, then the smaller id. The choice never
//! depends on the order rows come back from the store.

use std::collections::HashSet;
use tracing::{debug, info, trace};

use crate::errors::StoreResult;
use crate::noise_patterns::{DEFAULT_MIN_LENGTH, DEFAULT_PARTIAL_MATCH_WINDOW};
use crate::recipe_model::IngredientRecord;
use crate::store::IngredientCatalog;
use crate::text_processing::Candidate;

/// Catalog-backed resolver for ingredient candidates
pub struct IngredientMatcher<C> {
    catalog: C,
    partial_match_window: usize,
    min_partial_length: usize,
}

impl<C: IngredientCatalog> IngredientMatcher<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_window(catalog, DEFAULT_PARTIAL_MATCH_WINDOW)
    }

    /// Create a matcher with a custom partial-match window (at least 1)
    pub fn with_window(catalog: C, partial_match_window: usize) -> Self {
        Self {
            catalog,
            partial_match_window: partial_match_window.max(1),
            min_partial_length: DEFAULT_MIN_LENGTH,
        }
    }

    /// Ignore catalog names shorter than `min_partial_length` characters when
    /// they are found inside a candidate
    pub fn with_min_partial_length(mut self, min_partial_length: usize) -> Self {
        self.min_partial_length = min_partial_length;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolve one candidate to a catalog record
    ///
    /// Returns `Ok(None)` when nothing in the catalog matches.
    pub async fn match_candidate(&self, candidate: &str) -> StoreResult<Option<IngredientRecord>> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Ok(None);
        }

        if let Some(record) = self.catalog.find_exact(candidate).await? {
            trace!("Exact match '{}' -> '{}'", candidate, record.name);
            return Ok(Some(record));
        }

        let mut hits = self
            .catalog
            .find_containing(candidate, self.partial_match_window)
            .await?;
        let min_len = self.min_partial_length;
        hits.extend(
            self.catalog
                .find_contained_in(candidate, self.partial_match_window)
                .await?
                .into_iter()
                .filter(|record| record.name.chars().count() >= min_len),
        );

        let best = best_partial_match(candidate, hits);
        match &best {
            Some(record) => trace!("Partial match '{}' -> '{}'", candidate, record.name),
            None => trace!("No catalog match for '{}'", candidate),
        }
        Ok(best)
    }

    /// Resolve every candidate and return the unique catalog names, in
    /// first-seen order
    ///
    /// Candidates without a match are dropped. Any catalog failure aborts the
    /// whole call and no partial result is returned.
    pub async fn match_candidates(&self, candidates: &[Candidate]) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        let mut misses = 0usize;

        for candidate in candidates {
            match self.match_candidate(&candidate.text).await? {
                Some(record) => {
                    if seen.insert(record.name.clone()) {
                        matched.push(record.name);
                    } else {
                        debug!(
                            "Candidate '{}' resolved to already matched '{}'",
                            candidate.text, record.name
                        );
                    }
                }
                None => misses += 1,
            }
        }

        info!(
            candidates = candidates.len(),
            matched = matched.len(),
            misses,
            "Matched candidates against ingredient catalog"
        );
        Ok(matched)
    }
}

/// Pick the partial hit closest in length to the candidate
///
/// Hits that do not actually satisfy the substring relation (in either
/// direction, case-insensitively) are ignored.
pub fn best_partial_match(
    candidate: &str,
    hits: impl IntoIterator<Item = IngredientRecord>,
) -> Option<IngredientRecord> {
    let needle = candidate.to_lowercase();
    let needle_len = needle.chars().count();

    hits.into_iter()
        .filter(|record| {
            let name = record.name.to_lowercase();
            !name.is_empty() && (name.contains(&needle) || needle.contains(&name))
        })
        .min_by(|a, b| {
            let distance = |r: &IngredientRecord| r.name.chars().count().abs_diff(needle_len);
            distance(a)
                .cmp(&distance(b))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        })
}
