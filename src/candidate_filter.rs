//! # Candidate Filter Module
//!
//! Decides whether a normalized string plausibly names an ingredient and
//! removes duplicate candidates from one document.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

use crate::errors::ConfigError;
use crate::extraction_config::ExtractionConfig;
use crate::text_processing::Candidate;

/// Plausibility filter built from an [`ExtractionConfig`]
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    min_length: usize,
    max_length: usize,
    allowed: Regex,
    noise_keywords: BTreeSet<String>,
}

impl CandidateFilter {
    /// Create a filter with the default Korean receipt vocabulary
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&ExtractionConfig::default())
    }

    /// Create a filter from a custom configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_recipes::candidate_filter::CandidateFilter;
    /// use receipt_recipes::extraction_config::ExtractionConfig;
    ///
    /// let mut config = ExtractionConfig::default();
    /// config.allowed_pattern = r"^[a-z][a-z ]*$".to_string();
    /// config.noise_keywords.clear();
    /// config.noise_keywords.insert("till".to_string(), ["total".to_string()].into());
    ///
    /// let filter = CandidateFilter::with_config(&config)?;
    /// assert!(filter.is_plausible_ingredient("butter"));
    /// assert!(!filter.is_plausible_ingredient("subtotal"));
    /// # Ok::<(), receipt_recipes::errors::ConfigError>(())
    /// ```
    pub fn with_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let allowed = Regex::new(&config.allowed_pattern).map_err(|source| ConfigError::Pattern {
            pattern: config.allowed_pattern.clone(),
            source,
        })?;

        Ok(Self {
            min_length: config.min_length,
            max_length: config.max_length,
            allowed,
            noise_keywords: config.all_noise_keywords(),
        })
    }

    /// Check whether a normalized candidate could be an ingredient name
    ///
    /// Rejects candidates outside the length bounds, purely numeric
    /// candidates, candidates containing a noise keyword and candidates that
    /// do not match the allowed character class.
    pub fn is_plausible_ingredient(&self, candidate: &str) -> bool {
        match self.rejection_reason(candidate) {
            Some(reason) => {
                trace!("Rejected '{}': {}", candidate, reason);
                false
            }
            None => true,
        }
    }

    /// Why a candidate fails the plausibility checks, or `None` if it passes
    fn rejection_reason(&self, candidate: &str) -> Option<String> {
        let length = candidate.chars().count();
        if length < self.min_length || length > self.max_length {
            return Some(format!("length {} out of bounds", length));
        }

        if candidate.chars().all(|c| c.is_numeric() || c.is_whitespace()) {
            return Some("numeric".to_string());
        }

        let lowered = candidate.to_lowercase();
        if let Some(keyword) = self
            .noise_keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
        {
            return Some(format!("noise keyword '{}'", keyword));
        }

        if !self.allowed.is_match(candidate) {
            return Some("outside allowed character class".to_string());
        }

        None
    }

    /// Keep plausible candidates and drop duplicates, preserving first-seen order
    pub fn filter_candidates(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let total = candidates.len();
        let plausible: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| match self.rejection_reason(&c.text) {
                Some(reason) => {
                    trace!(line = ?c.source_line, "Rejected '{}': {}", c.text, reason);
                    false
                }
                None => true,
            })
            .collect();
        let plausible_count = plausible.len();
        let unique = dedup_candidates(plausible);

        debug!(
            total,
            rejected = total - plausible_count,
            duplicates = plausible_count - unique.len(),
            kept = unique.len(),
            "Filtered candidates"
        );
        unique
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::new().expect("Default filter configuration should be valid")
    }
}

/// Reduce candidates to unique texts, keeping the first occurrence of each
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.text.clone()))
        .collect()
}
