// src/engine/matcher.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::{NUMERIC_ABSOLUTE_FLOOR, NUMERIC_RELATIVE_TOLERANCE, SIGNIFICANT_WORD_LEN},
    engine::{evaluator, normalize::subject::is_quantitative},
    utils::text::{collapse_whitespace, strip_diacritics},
};

static WRAPPING_DOLLARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$+|\$+$").expect("valid dollar regex"));
static TEXT_CMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\text\s*\{([^{}]*)\}").expect("valid text regex"));
static THIN_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[,;:! ]|~").expect("valid thin-space regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:[.,]\d+)?|[.,]\d+)$").expect("valid number regex"));

/// Knobs for a single match.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions<'a> {
    /// Raw or canonical subject of the exam; quantitative subjects never use fuzzy matching.
    pub subject: Option<&'a str>,
    /// When false only exact (normalised) equality is accepted.
    pub tolerant: bool,
}

impl Default for MatchOptions<'_> {
    fn default() -> Self {
        Self {
            subject: None,
            tolerant: true,
        }
    }
}

impl<'a> MatchOptions<'a> {
    pub fn for_subject(subject: &'a str) -> Self {
        Self {
            subject: Some(subject),
            tolerant: true,
        }
    }
}

/// Canonical comparison form of an answer.
///
/// Lowercase, accent-free, without wrapping `$`, `\text{..}` unwrapped,
/// LaTeX thin spaces removed and whitespace collapsed.
pub fn normalize_answer(raw: &str) -> String {
    let lowered = strip_diacritics(&raw.trim().to_lowercase());
    let unwrapped = WRAPPING_DOLLARS.replace_all(lowered.trim(), "");
    let unwrapped = TEXT_CMD.replace_all(&unwrapped, "$1");
    let spaced = THIN_SPACE.replace_all(&unwrapped, " ");
    collapse_whitespace(&spaced)
}

/// Parses "3,14" or "-2.5" after normalisation.
pub fn parse_number(normalized: &str) -> Option<f64> {
    let compact = normalized.replace(' ', "");
    if !NUMBER.is_match(&compact) {
        return None;
    }
    compact.replace(',', ".").parse().ok()
}

/// Numeric tolerance: within `max(|expected| * 1%, 0.01)`, boundary included.
pub fn numbers_match(user: f64, expected: f64) -> bool {
    let tolerance = (expected.abs() * NUMERIC_RELATIVE_TOLERANCE).max(NUMERIC_ABSOLUTE_FLOOR);
    (user - expected).abs() <= tolerance
}

/// Decides whether `user` matches `expected` or any of `alternatives`.
///
/// Each candidate is tried in turn with exact, numeric, symbolic and (outside
/// quantitative subjects) fuzzy word matching; the first hit wins.
pub fn matches(
    user: &str,
    expected: &str,
    alternatives: &[String],
    options: MatchOptions<'_>,
) -> bool {
    let user_norm = normalize_answer(user);
    if user_norm.is_empty() {
        return false;
    }

    let fuzzy_allowed = options.tolerant && !options.subject.is_some_and(is_quantitative);

    std::iter::once(expected)
        .chain(alternatives.iter().map(String::as_str))
        .any(|candidate| {
            let expected_norm = normalize_answer(candidate);
            if expected_norm.is_empty() {
                return false;
            }
            if user_norm == expected_norm {
                return true;
            }
            if !options.tolerant {
                return false;
            }
            if let (Some(u), Some(e)) = (parse_number(&user_norm), parse_number(&expected_norm)) {
                if numbers_match(u, e) {
                    return true;
                }
            }
            if evaluator::equivalent(&user_norm, &expected_norm).equal {
                return true;
            }
            fuzzy_allowed && fuzzy_word_match(&user_norm, &expected_norm)
        })
}

fn significant_words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= SIGNIFICANT_WORD_LEN)
        .collect()
}

/// Lenient free-text match: one shared significant word is enough when the
/// expected answer has several (a surname alone for a full name).
/// Both inputs are already normalised.
pub fn fuzzy_word_match(user: &str, expected: &str) -> bool {
    if user == expected {
        return true;
    }
    let expected_words = significant_words(expected);
    if expected_words.len() < 2 {
        return false;
    }
    significant_words(user)
        .iter()
        .any(|word| expected_words.contains(word))
}
