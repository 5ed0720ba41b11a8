// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Relative part of the numeric answer tolerance (1% of the expected value).
pub const NUMERIC_RELATIVE_TOLERANCE: f64 = 0.01;

/// Absolute floor of the numeric answer tolerance, so answers near zero still match.
pub const NUMERIC_ABSOLUTE_FLOOR: f64 = 0.01;

/// Default tolerance for expression equivalence.
pub const EQUIVALENCE_TOLERANCE: f64 = 0.001;

/// Sentences at or above this length are never treated as exam rules.
pub const RULE_SENTENCE_MAX_CHARS: usize = 300;

/// Rule classification is only applied when at least this many rule sentences are found.
pub const MIN_RULE_SENTENCES: usize = 2;

/// Words shorter than this are ignored by the fuzzy word matcher.
pub const SIGNIFICANT_WORD_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_path: String,
    pub coefficients_path: Option<String>,
    pub bind_addr: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let catalog_path =
            env::var("CATALOG_PATH").unwrap_or_else(|_| "data/exam_catalog.json".to_string());

        let coefficients_path = env::var("COEFFICIENTS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            catalog_path,
            coefficients_path,
            bind_addr,
            rust_log,
        }
    }
}
