//! # Application Configuration Module
//!
//! Runtime settings for the binary, read from environment variables (a `.env`
//! file is honoured through `dotenv`).
//!
//! ## Variables
//!
//! | Variable                 | Default   |
//! |--------------------------|-----------|
//! | `DATABASE_URL`           | required  |
//! | `DB_MAX_CONNECTIONS`     | `5`       |
//! | `DB_QUERY_TIMEOUT_SECS`  | `10`      |
//! | `MAX_PAGE_SIZE`          | `50`      |
//! | `CATALOG_CACHE_CAPACITY` | `10000`   |
//! | `OCR_LANGUAGES`          | `kor+eng` |
//! | `EXTRACTION_CONFIG_PATH` | built-in  |
//! | `LOG_FORMAT`             | `pretty`  |

use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::catalog_cache::DEFAULT_CACHE_CAPACITY;
use crate::errors::ConfigError;
use crate::extraction_config::ExtractionConfig;
use crate::logging::LogFormat;
use crate::ocr_config::OcrConfig;
use crate::ranking::DEFAULT_MAX_PAGE_SIZE;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the Postgres store
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Everything the binary needs to start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub max_page_size: usize,
    pub catalog_cache_capacity: usize,
    pub ocr: OcrConfig,
    pub extraction: ExtractionConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_recipes::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|name| match name {
    ///     "DATABASE_URL" => Some("postgres://localhost/recipes".to_string()),
    ///     "MAX_PAGE_SIZE" => Some("20".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.max_page_size, 20);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid("DATABASE_URL must be set".to_string()))?;

        let mut database = DatabaseConfig::new(url);
        if let Some(max_connections) = parse_var(&lookup, "DB_MAX_CONNECTIONS")? {
            database.max_connections = max_connections;
        }
        if let Some(secs) = parse_var(&lookup, "DB_QUERY_TIMEOUT_SECS")? {
            database.query_timeout = Duration::from_secs(secs);
        }

        let mut ocr = OcrConfig::default();
        if let Some(languages) = lookup("OCR_LANGUAGES").filter(|l| !l.trim().is_empty()) {
            ocr.languages = languages.trim().to_string();
        }

        let extraction = match lookup("EXTRACTION_CONFIG_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                info!("Loading extraction vocabulary from {}", path);
                ExtractionConfig::from_json_file(path.trim())?
            }
            None => ExtractionConfig::default(),
        };

        let config = Self {
            database,
            max_page_size: parse_var(&lookup, "MAX_PAGE_SIZE")?.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
            catalog_cache_capacity: parse_var(&lookup, "CATALOG_CACHE_CAPACITY")?
                .unwrap_or(DEFAULT_CACHE_CAPACITY),
            ocr,
            extraction,
            log_format: parse_var(&lookup, "LOG_FORMAT")?.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }
        if self.database.query_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "DB_QUERY_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "MAX_PAGE_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.catalog_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "CATALOG_CACHE_CAPACITY must be greater than 0".to_string(),
            ));
        }
        self.ocr.validate()?;
        self.extraction.validate()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env {
                name: name.to_string(),
                value,
            }),
    }
}
