use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use tracing::info;

use receipt_recipes::catalog_cache::CachedCatalog;
use receipt_recipes::config::AppConfig;
use receipt_recipes::db::{self, PgStore};
use receipt_recipes::logging::init_tracing;
use receipt_recipes::ocr;
use receipt_recipes::ocr_config::OcrConfig;
use receipt_recipes::{RecipeFinder, SearchRequest, SortKey};

const USAGE: &str = "usage: receipt-recipes <receipt.txt|receipt.png> [latest|views|likes] [limit] [offset]";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (and .env) before logging so LOG_FORMAT applies
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    info!("Starting receipt recipe search");

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.first() else {
        bail!(USAGE);
    };

    let sort_key: SortKey = match args.get(1) {
        Some(value) => value.parse()?,
        None => SortKey::default(),
    };
    let limit: usize = match args.get(2) {
        Some(value) => value.parse().with_context(|| format!("Invalid limit '{}'", value))?,
        None => receipt_recipes::ranking::DEFAULT_PAGE_SIZE,
    };
    let offset: usize = match args.get(3) {
        Some(value) => value.parse().with_context(|| format!("Invalid offset '{}'", value))?,
        None => 0,
    };

    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path))?;
    let receipt_text = read_receipt_text(&bytes, &config.ocr)?;

    let store = PgStore::connect(&config.database).await?;
    db::init_database_schema(store.pool()).await?;

    let catalog = CachedCatalog::with_capacity(store.clone(), config.catalog_cache_capacity);
    let finder = RecipeFinder::from_app_config(catalog, store, &config)?;

    let request = SearchRequest::new(Vec::<String>::new())
        .sorted_by(sort_key)
        .page(limit, offset);
    let result = finder.find_recipes_for_receipt(&receipt_text, request).await?;

    info!(
        ingredients = result.extracted.len(),
        total = result.page.total_count,
        "Search finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Run OCR on image input, otherwise treat the file as UTF-8 receipt text
fn read_receipt_text(bytes: &[u8], ocr_config: &OcrConfig) -> Result<String> {
    if ocr::detect_image_format(bytes, ocr_config).is_none() {
        return String::from_utf8(bytes.to_vec()).context("Receipt text is not valid UTF-8");
    }
    recognize_image(bytes, ocr_config)
}

#[cfg(feature = "tesseract")]
fn recognize_image(bytes: &[u8], ocr_config: &OcrConfig) -> Result<String> {
    let engine = ocr::TesseractEngine::new(ocr_config.clone());
    Ok(ocr::recognize_receipt(&engine, bytes, ocr_config)?)
}

#[cfg(not(feature = "tesseract"))]
fn recognize_image(_bytes: &[u8], _ocr_config: &OcrConfig) -> Result<String> {
    bail!("Image input needs the `tesseract` feature; pass receipt text instead")
}
