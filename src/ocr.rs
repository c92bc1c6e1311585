//! # OCR Collaborator Module
//!
//! The OCR engine turns a receipt photo into raw text. Only the contract
//! matters to the rest of the crate: image bytes in, UTF-8 text out, possibly
//! multi-line, possibly empty. A Tesseract-backed engine is available with
//! the `tesseract` feature.

use image::ImageFormat;
use tracing::{debug, info};

use crate::errors::OcrError;
use crate::ocr_config::OcrConfig;

/// Text recognition over raw image bytes
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Detect the image format from the leading bytes, if there are enough of them
pub fn detect_image_format(bytes: &[u8], config: &OcrConfig) -> Option<ImageFormat> {
    if bytes.len() < config.min_format_bytes {
        debug!(
            "Could not read enough bytes to determine image format (read {} bytes, need at least {})",
            bytes.len(),
            config.min_format_bytes
        );
        return None;
    }

    let head = &bytes[..bytes.len().min(config.buffer_size)];
    match image::guess_format(head) {
        Ok(format) => Some(format),
        Err(e) => {
            debug!("Could not determine image format: {}", e);
            None
        }
    }
}

/// Check whether the bytes are an image format Tesseract accepts
pub fn is_supported_image_format(bytes: &[u8], config: &OcrConfig) -> bool {
    // Tesseract supports: PNG, JPEG/JPG, BMP, TIFF
    matches!(
        detect_image_format(bytes, config),
        Some(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff)
    )
}

/// Validate an image before handing it to the engine
pub fn validate_image(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, OcrError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(OcrError::Validation(format!(
            "Image too large: {} bytes (maximum {} bytes)",
            bytes.len(),
            config.max_file_size
        )));
    }

    match detect_image_format(bytes, config) {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff)) => {
            Ok(format)
        }
        Some(other) => Err(OcrError::Validation(format!(
            "Unsupported image format: {other:?}"
        ))),
        None => Err(OcrError::Validation(
            "Could not determine image format".to_string(),
        )),
    }
}

/// Validate the image, then run the engine on it
pub fn recognize_receipt(
    engine: &dyn OcrEngine,
    image: &[u8],
    config: &OcrConfig,
) -> Result<String, OcrError> {
    let format = validate_image(image, config)?;
    info!(?format, bytes = image.len(), "Starting OCR text extraction");

    let text = engine.recognize(image)?;
    info!(
        "OCR extraction completed. Extracted {} characters of text",
        text.chars().count()
    );
    Ok(text)
}

/// Trim every line and drop blank lines from recognized text
pub fn clean_recognized_text(text: &str) -> String {
    text.trim()
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

#[cfg(feature = "tesseract")]
pub use tesseract_engine::TesseractEngine;

#[cfg(feature = "tesseract")]
mod tesseract_engine {
    use leptess::LepTess;
    use tracing::debug;

    use super::{clean_recognized_text, OcrEngine};
    use crate::errors::OcrError;
    use crate::ocr_config::OcrConfig;

    /// Tesseract OCR engine; a fresh Tesseract instance is created per call
    pub struct TesseractEngine {
        config: OcrConfig,
    }

    impl TesseractEngine {
        pub fn new(config: OcrConfig) -> Self {
            Self { config }
        }
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
            debug!(languages = %self.config.languages, "Initializing Tesseract");
            let mut tess = LepTess::new(None, &self.config.languages).map_err(|e| {
                OcrError::Initialization(format!("Failed to initialize Tesseract OCR: {}", e))
            })?;

            tess.set_image_from_mem(image)
                .map_err(|e| OcrError::ImageLoad(format!("Failed to load image for OCR: {}", e)))?;

            let extracted_text = tess.get_utf8_text().map_err(|e| {
                OcrError::Extraction(format!("Failed to extract text from image: {}", e))
            })?;

            Ok(clean_recognized_text(&extracted_text))
        }
    }
}
