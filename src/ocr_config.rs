//! # OCR Configuration Module
//!
//! Settings for the OCR collaborator: recognition languages and the limits
//! applied to uploaded images before they reach the engine.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "kor+eng";
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for receipt photos

/// Configuration structure for OCR processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// OCR language codes (e.g., "kor", "kor+eng")
    pub languages: String,
    /// Number of leading bytes inspected for format detection
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed image size in bytes
    pub max_file_size: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl OcrConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "OCR languages cannot be empty".to_string(),
            ));
        }
        if self.min_format_bytes == 0 || self.min_format_bytes > self.buffer_size {
            return Err(ConfigError::Invalid(format!(
                "min_format_bytes ({}) must be between 1 and buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OcrConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = OcrConfig {
            languages: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OcrConfig {
            min_format_bytes: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
