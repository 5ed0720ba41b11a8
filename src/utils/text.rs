// src/utils/text.rs

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Removes accents and other combining marks.
///
/// The text is decomposed (NFD) and every combining mark is dropped,
/// so "Géographie" becomes "Geographie" and "Kreyòl" becomes "Kreyol".
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lookup key used by the normalisation tables: lowercase, accent-free, single-spaced.
pub fn fold(input: &str) -> String {
    collapse_whitespace(&strip_diacritics(&input.to_lowercase()))
}

/// Uppercases the first character and lowercases the rest.
pub fn sentence_case(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// True when the text has letters and none of them are lowercase.
pub fn is_all_caps(input: &str) -> bool {
    let mut has_letter = false;
    for c in input.chars().filter(|c| c.is_alphabetic()) {
        has_letter = true;
        if c.is_lowercase() {
            return false;
        }
    }
    has_letter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Géographie"), "Geographie");
        assert_eq!(strip_diacritics("Kreyòl"), "Kreyol");
        assert_eq!(strip_diacritics("Économie"), "Economie");
        assert_eq!(strip_diacritics("plain"), "plain");
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Histoire   ET Géographie "), "histoire et geographie");
    }

    #[test]
    fn test_sentence_case() {
        assert_eq!(sentence_case("CHIMIE ORGANIQUE"), "Chimie organique");
        assert_eq!(sentence_case("éLECTRICITÉ"), "Électricité");
        assert_eq!(sentence_case(""), "");
    }

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("CHIMIE ORGANIQUE 2"));
        assert!(!is_all_caps("Chimie organique"));
        assert!(!is_all_caps("2019"));
    }
}
