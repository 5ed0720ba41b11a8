// src/engine/normalize/mod.rs

pub mod level;
pub mod subject;
pub mod title;
pub mod year;

pub use level::{level_from_title, normalize_level};
pub use subject::{canonical_subject, is_language, is_quantitative, normalize_subject};
pub use title::normalize_title;
pub use year::{ExamYear, parse_year};
