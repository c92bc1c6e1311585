//! # Text Processing Module
//!
//! This module turns raw OCR text from a grocery receipt into candidate
//! ingredient strings.
//!
//! ## Features
//!
//! - Strips prices, quantities with their units, currency markers and punctuation
//! - Drops standalone unit and currency tokens (`개`, `kg`, `원`, ...)
//! - Collapses whitespace so equal names compare equal
//! - **Whole-line rule**: every line is a candidate on its own, so multi-word
//!   names such as "그릭 요거트" survive next to their individual words

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::errors::ConfigError;
use crate::extraction_config::ExtractionConfig;
use crate::noise_patterns::{DIGIT_RUN_REGEX, NON_TEXT_REGEX};

/// A cleaned token considered for ingredient-hood before catalog resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// The normalized text (e.g., "사과", "그릭 요거트")
    pub text: String,
    /// The 0-based line the candidate came from, logged when it is rejected
    pub source_line: Option<usize>,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_line: None,
        }
    }

    pub fn from_line(text: impl Into<String>, line_number: usize) -> Self {
        Self {
            text: text.into(),
            source_line: Some(line_number),
        }
    }
}

/// Receipt text normalizer
///
/// Holds the compiled quantity pattern and the set of tokens that are dropped
/// when they stand alone. Both are derived from an [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Digit run followed by a unit or currency token (e.g. "500g", "3000원")
    quantity_pattern: Option<Regex>,
    /// Lowercased unit and currency tokens
    dropped_tokens: HashSet<String>,
}

lazy_static! {
    static ref DEFAULT_NORMALIZER: TextNormalizer =
        TextNormalizer::new().expect("Default normalizer vocabulary should be valid");
}

/// Normalize a raw line or word with the default vocabulary
///
/// # Examples
///
/// ```rust
/// use receipt_recipes::text_processing::normalize;
///
/// assert_eq!(normalize("사과 3,000원"), "사과");
/// assert_eq!(normalize("(특)  우유*2"), "특 우유");
/// assert_eq!(normalize("12345"), "");
/// ```
pub fn normalize(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

impl TextNormalizer {
    /// Create a normalizer with the default unit and currency vocabulary
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&ExtractionConfig::default())
    }

    /// Create a normalizer from a custom configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Extraction configuration holding the unit and currency tokens
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_recipes::extraction_config::ExtractionConfig;
    /// use receipt_recipes::text_processing::TextNormalizer;
    ///
    /// let config = ExtractionConfig {
    ///     unit_tokens: vec!["cups".to_string()],
    ///     currency_tokens: vec!["eur".to_string()],
    ///     ..Default::default()
    /// };
    /// let normalizer = TextNormalizer::with_config(&config)?;
    /// assert_eq!(normalizer.normalize("2 cups flour 3 EUR"), "flour");
    /// # Ok::<(), receipt_recipes::errors::ConfigError>(())
    /// ```
    pub fn with_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let mut suffixes: Vec<String> = config
            .unit_tokens
            .iter()
            .chain(config.currency_tokens.iter())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first so "개입" wins over "개"
        suffixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        suffixes.dedup();

        let quantity_pattern = if suffixes.is_empty() {
            None
        } else {
            let alternation = suffixes
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\p{{N}}+\s*(?:{alternation})\b");
            debug!("Compiling quantity pattern with {} suffixes", suffixes.len());
            Some(
                Regex::new(&pattern)
                    .map_err(|source| ConfigError::Pattern { pattern, source })?,
            )
        };

        Ok(Self {
            quantity_pattern,
            dropped_tokens: suffixes.into_iter().collect(),
        })
    }

    /// Clean a raw line or word into a canonical candidate string
    ///
    /// Punctuation, brackets and symbols become spaces, quantities with their
    /// unit or currency suffix are removed, remaining digit runs are removed,
    /// standalone unit and currency tokens are dropped and whitespace is
    /// collapsed. The result is empty when nothing survives.
    ///
    /// Normalizing twice gives the same result as normalizing once.
    pub fn normalize(&self, raw: &str) -> String {
        let without_symbols = NON_TEXT_REGEX.replace_all(raw, " ");
        let without_quantities = match &self.quantity_pattern {
            Some(pattern) => pattern.replace_all(&without_symbols, " ").into_owned(),
            None => without_symbols.into_owned(),
        };
        let without_digits = DIGIT_RUN_REGEX.replace_all(&without_quantities, " ");

        let normalized = without_digits
            .split_whitespace()
            .filter(|token| !self.dropped_tokens.contains(&token.to_lowercase()))
            .collect::<Vec<&str>>()
            .join(" ");

        trace!("Normalized '{}' -> '{}'", raw, normalized);
        normalized
    }

    /// Split raw OCR text into candidates
    ///
    /// For every line the whole normalized line is emitted first, followed by
    /// each normalized whitespace-separated token. Empty results are skipped.
    /// Duplicates are kept; [`crate::candidate_filter::dedup_candidates`]
    /// removes them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_recipes::text_processing::TextNormalizer;
    ///
    /// let normalizer = TextNormalizer::default();
    /// let candidates = normalizer.extract_candidates("그릭 요거트 2개\n우유 2,500원");
    /// let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
    ///
    /// assert_eq!(texts, vec!["그릭 요거트", "그릭", "요거트", "우유", "우유"]);
    /// assert_eq!(candidates[3].source_line, Some(1));
    /// ```
    pub fn extract_candidates(&self, raw: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (line_number, line) in raw.lines().enumerate() {
            let whole_line = self.normalize(line);
            if whole_line.is_empty() {
                trace!("Line {} has no candidate text", line_number);
                continue;
            }
            candidates.push(Candidate::from_line(whole_line, line_number));

            for token in line.split_whitespace() {
                let text = self.normalize(token);
                if !text.is_empty() {
                    candidates.push(Candidate::from_line(text, line_number));
                }
            }
        }

        debug!(
            lines = raw.lines().count(),
            candidates = candidates.len(),
            "Extracted raw candidates"
        );
        candidates
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new().expect("Default normalizer vocabulary should be valid")
    }
}
