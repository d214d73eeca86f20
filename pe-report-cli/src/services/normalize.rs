//! Label canonicalization for access-track (OP2) matching

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical form of a free-text label
///
/// Trims, lower-cases, turns en/em dashes into `-`, strips accents and any
/// other non-ASCII character, then replaces each two-space run with one
/// space. Only literal double spaces are touched; longer runs shrink by half.
pub fn normalize(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let lowered = value
        .trim()
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-");

    let ascii: String = lowered
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect();

    ascii.replace("  ", " ")
}

/// Normalize a label that is always present
pub fn normalize_str(value: &str) -> String {
    normalize(Some(value))
}
