//! # Receipt Recipes
//!
//! Turns the raw OCR text of a grocery receipt into the catalog ingredients it
//! mentions, then finds recipes that use them.
//!
//! ## Features
//! - Receipt text normalization (prices, quantities, units, symbols)
//! - Plausibility filtering with configurable noise vocabularies
//! - Exact and partial matching against an ingredient catalog
//! - Scored recipe ranking with stable pagination
//! - Postgres and in-memory stores, plus a read-through catalog cache
//! - Optional Tesseract OCR (`tesseract` feature)

pub mod candidate_filter;
pub mod catalog_cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod extraction_config;
pub mod ingredient_matcher;
pub mod logging;
pub mod memory_store;
pub mod noise_patterns;
pub mod ocr;
pub mod ocr_config;
pub mod pipeline;
pub mod ranking;
pub mod recipe_model;
pub mod store;
pub mod text_processing;

pub use errors::{ConfigError, FinderError, OcrError, StoreError};
pub use pipeline::{ReceiptSearch, RecipeFinder};
pub use ranking::{Page, RankedRecipe, SearchRequest, SortKey};
