//! # Noise Patterns Module
//!
//! Default vocabularies and compiled regexes used to clean receipt text.
//! The vocabularies only seed [`crate::extraction_config::ExtractionConfig`];
//! the filtering logic never reads them directly.

use lazy_static::lazy_static;
use regex::Regex;

/// Hangul syllables, optionally mixed with digits and inner spaces
pub const DEFAULT_ALLOWED_PATTERN: &str = r"^[가-힣][가-힣0-9 ]*$";

pub const DEFAULT_MIN_LENGTH: usize = 2;
pub const DEFAULT_MAX_LENGTH: usize = 15;
pub const DEFAULT_PARTIAL_MATCH_WINDOW: usize = 3;

/// Weight, volume and count units printed next to quantities on receipts
pub const DEFAULT_UNIT_TOKENS: &[&str] = &[
    // Korean count units
    "개", "개입", "입", "팩", "봉", "봉지", "병", "캔", "통", "망", "단", "묶음", "박스", "상자",
    "판", "구", "알", "매", "장", "마리", "포기", "송이", "근",
    // Metric and imperial
    "g", "kg", "mg", "ml", "l", "cc", "oz", "lb", "lbs", "ea", "pc", "pcs", "pack",
];

pub const DEFAULT_CURRENCY_TOKENS: &[&str] = &["원", "₩", "krw", "won", "$", "usd"];

/// Store, payment and unit vocabulary that never names an ingredient
pub const DEFAULT_NOISE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "payment",
        &[
            "할인", "카드", "현금", "포인트", "합계", "총액", "결제", "승인", "부가세", "과세", "면세",
            "거스름", "받은금액", "잔액", "적립", "쿠폰", "금액", "단가", "수량",
        ],
    ),
    (
        "store",
        &[
            "영수증", "매장", "마트", "사업자", "대표", "전화", "주소", "계산원", "고객", "회원",
            "교환", "환불", "봉투", "쇼핑백", "상품명", "일시",
        ],
    ),
    (
        "english",
        &[
            "discount", "point", "card", "cash", "total", "bag", "tax", "change", "receipt",
            "amount",
        ],
    ),
    ("units", &["kg", "ml", "pcs"]),
];

lazy_static! {
    /// Anything that is not a letter, mark, number or whitespace
    pub static ref NON_TEXT_REGEX: Regex =
        Regex::new(r"[^\p{L}\p{M}\p{N}\s]").expect("Non-text pattern should be valid");

    /// Remaining digit runs, including non-ASCII numerals
    pub static ref DIGIT_RUN_REGEX: Regex =
        Regex::new(r"\p{N}+").expect("Digit run pattern should be valid");
}
