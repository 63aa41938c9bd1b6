//! Lexical detectors for raw cell values

use once_cell::sync::Lazy;
use regex::Regex;

// Canonical, 32-hex, braced and URN spellings of an RFC 4122 UUID
static GUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}|[0-9a-fA-F]{32}|\{[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}\}|urn:uuid:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12})$",
    )
    .unwrap()
});

/// Cell spellings a loader treats as null
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#NA", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN",
];

/// Extra spellings treated as missing while probing for datetimes
const DATETIME_NULL_TOKENS: &[&str] = &[
    "", "nat", "NaT", "none", "None", "null", "NULL", "nan", "NaN",
];

const TRUE_TOKENS: &[&str] = &["true", "True", "TRUE"];
const FALSE_TOKENS: &[&str] = &["false", "False", "FALSE"];

/// Whether a raw cell should be loaded as null
pub fn is_null_token(value: &str) -> bool {
    NULL_TOKENS.contains(&value.trim())
}

/// Whether a value is missing for the purpose of datetime detection
pub fn is_datetime_null(value: &str) -> bool {
    DATETIME_NULL_TOKENS.contains(&value.trim())
}

/// Whether a value is a GUID/UUID in one of the accepted spellings
pub fn is_guid(value: &str) -> bool {
    GUID_REGEX.is_match(value.trim())
}

/// Parse a boolean token
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if TRUE_TOKENS.contains(&value) {
        Some(true)
    } else if FALSE_TOKENS.contains(&value) {
        Some(false)
    } else {
        None
    }
}

/// Parse a finite number
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

/// Parse an integral value exactly
///
/// Plain integer text is parsed without going through `f64`, so values past
/// 2^53 keep every digit. Integral floats such as `3.0` or `1e3` are accepted
/// when they fit in `i64`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(integer);
    }
    let number = parse_number(trimmed)?;
    if number.fract() == 0.0 && number >= i64::MIN as f64 && number < i64::MAX as f64 {
        Some(number as i64)
    } else {
        None
    }
}

/// Whether a number has no fractional part
pub fn is_integral(number: f64) -> bool {
    number.is_finite() && number.fract() == 0.0
}

/// Render a number the way domains spell it (`1` rather than `1.0`)
pub fn format_number(number: f64) -> String {
    if is_integral(number) && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

/// Fraction of values satisfying `predicate`, 0.0 for an empty slice
pub fn match_fraction<'a>(
    values: impl IntoIterator<Item = &'a str>,
    predicate: impl Fn(&str) -> bool,
) -> f64 {
    let mut total = 0usize;
    let mut matched = 0usize;
    for value in values {
        total += 1;
        if predicate(value) {
            matched += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}
