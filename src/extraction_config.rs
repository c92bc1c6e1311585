//! # Extraction Configuration Module
//!
//! Tunables for turning receipt text into ingredient candidates: length
//! bounds, the accepted character class, noise keyword sets and the unit and
//! currency vocabularies. Everything here is plain data so the filter can be
//! exercised against synthetic vocabularies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::ConfigError;
use crate::noise_patterns::{
    DEFAULT_ALLOWED_PATTERN, DEFAULT_CURRENCY_TOKENS, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH,
    DEFAULT_NOISE_KEYWORDS, DEFAULT_PARTIAL_MATCH_WINDOW, DEFAULT_UNIT_TOKENS,
};

/// Configuration for candidate extraction and matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum candidate length in characters
    pub min_length: usize,
    /// Maximum candidate length in characters
    pub max_length: usize,
    /// Regex a candidate must match in full to be considered an ingredient
    pub allowed_pattern: String,
    /// Keyword set name -> keywords; a candidate containing any keyword is noise
    pub noise_keywords: BTreeMap<String, BTreeSet<String>>,
    /// Units stripped after quantities and dropped as standalone tokens
    pub unit_tokens: Vec<String>,
    /// Currency markers stripped after prices and dropped as standalone tokens
    pub currency_tokens: Vec<String>,
    /// How many catalog rows a partial-match lookup may return
    pub partial_match_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let noise_keywords: BTreeMap<String, BTreeSet<String>> = DEFAULT_NOISE_KEYWORDS
            .iter()
            .map(|(set, words)| {
                (
                    set.to_string(),
                    words.iter().map(|w| w.to_string()).collect(),
                )
            })
            .collect();

        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            allowed_pattern: DEFAULT_ALLOWED_PATTERN.to_string(),
            noise_keywords,
            unit_tokens: DEFAULT_UNIT_TOKENS.iter().map(|t| t.to_string()).collect(),
            currency_tokens: DEFAULT_CURRENCY_TOKENS.iter().map(|t| t.to_string()).collect(),
            partial_match_window: DEFAULT_PARTIAL_MATCH_WINDOW,
        }
    }
}

impl ExtractionConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: ExtractionConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!(
            path = %path.display(),
            keyword_sets = config.noise_keywords.len(),
            "Loaded extraction config"
        );
        Ok(config)
    }

    /// Validate extraction configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::Invalid(
                "min_length must be greater than 0".to_string(),
            ));
        }
        if self.max_length < self.min_length {
            return Err(ConfigError::Invalid(format!(
                "max_length ({}) must not be smaller than min_length ({})",
                self.max_length, self.min_length
            )));
        }
        if self.partial_match_window == 0 {
            return Err(ConfigError::Invalid(
                "partial_match_window must be greater than 0".to_string(),
            ));
        }
        if self.allowed_pattern.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_pattern cannot be empty".to_string(),
            ));
        }
        regex::Regex::new(&self.allowed_pattern).map_err(|source| ConfigError::Pattern {
            pattern: self.allowed_pattern.clone(),
            source,
        })?;

        check_tokens(&self.unit_tokens, "unit_tokens")?;
        check_tokens(&self.currency_tokens, "currency_tokens")?;
        for (set, words) in &self.noise_keywords {
            check_tokens(words, &format!("noise_keywords.{set}"))?;
        }

        Ok(())
    }

    /// All noise keywords across every set, lowercased
    pub fn all_noise_keywords(&self) -> BTreeSet<String> {
        self.noise_keywords
            .values()
            .flatten()
            .map(|w| w.to_lowercase())
            .collect()
    }
}

fn check_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a String>,
    category: &str,
) -> Result<(), ConfigError> {
    for token in tokens {
        if token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{category} contains an empty entry"
            )));
        }
        if token.chars().any(|c| c.is_control()) {
            return Err(ConfigError::Invalid(format!(
                "{category} entry '{}' contains control characters",
                token.escape_debug()
            )));
        }
    }
    Ok(())
}
