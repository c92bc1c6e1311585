//! # Error Types Module
//!
//! Error types shared by the extraction and search pipeline.
//!
//! Store collaborators report [`StoreError`]. The pipeline wraps it into a
//! [`FinderError`] that records which stage failed, so callers can tell a
//! failed extraction from a failed search without parsing messages.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by an ingredient catalog or recipe store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database driver returned an error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached or refused the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by [`crate::pipeline::RecipeFinder`]
#[derive(Debug, Error)]
pub enum FinderError {
    /// The request was rejected before any store access
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A catalog lookup failed while resolving candidates
    #[error("Ingredient extraction failed: {0}")]
    Extraction(#[source] StoreError),

    /// The recipe store failed while ranking
    #[error("Recipe search failed: {0}")]
    Search(#[source] StoreError),

    /// The finder could not be built from its configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid or unreadable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or inconsistent with another value
    #[error("{0}")]
    Invalid(String),

    /// A pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An environment variable could not be parsed
    #[error("Environment variable {name} has invalid value '{value}'")]
    Env { name: String, value: String },

    /// A configuration file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid JSON for the expected shape
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Custom error types for OCR operations
#[derive(Debug, Error)]
pub enum OcrError {
    /// Input validation errors (size, format)
    #[error("Validation error: {0}")]
    Validation(String),
    /// OCR engine initialization errors
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Image loading errors
    #[error("Image load error: {0}")]
    ImageLoad(String),
    /// Text extraction errors
    #[error("Extraction error: {0}")]
    Extraction(String),
}

pub type FinderResult<T> = Result<T, FinderError>;
pub type StoreResult<T> = Result<T, StoreError>;
