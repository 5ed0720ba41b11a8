// src/engine/normalize/year.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::utils::text::fold;

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)\s*,?\s*((?:19|20)\d{2})\b",
    )
    .expect("valid month-year regex")
});

static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// Folded month name -> display name.
const MONTHS: [(&str, &str); 12] = [
    ("janvier", "Janvier"),
    ("fevrier", "Février"),
    ("mars", "Mars"),
    ("avril", "Avril"),
    ("mai", "Mai"),
    ("juin", "Juin"),
    ("juillet", "Juillet"),
    ("aout", "Août"),
    ("septembre", "Septembre"),
    ("octobre", "Octobre"),
    ("novembre", "Novembre"),
    ("decembre", "Décembre"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamYear {
    /// 0 when no year could be found.
    pub year: u32,
    /// "Juin 2019" when a month was written next to the year, else empty.
    pub session: String,
}

/// Month-year session found anywhere in `text`.
pub fn find_session(text: &str) -> Option<ExamYear> {
    let caps = MONTH_YEAR.captures(text)?;
    let month_key = fold(&caps[1]);
    let month = MONTHS
        .iter()
        .find(|(key, _)| *key == month_key)
        .map(|(_, display)| *display)?;
    let year: u32 = caps[2].parse().ok()?;
    Some(ExamYear {
        year,
        session: format!("{} {}", month, year),
    })
}

/// Parses a raw year field.
///
/// * "Juin 2019" -> 2019 with session "Juin 2019",
/// * "2016-2022" -> 2022 (the most recent year of a range),
/// * no digits -> 0 with an empty session.
pub fn parse_year(raw: &str) -> ExamYear {
    if let Some(found) = find_session(raw) {
        return found;
    }

    let year = FOUR_DIGITS
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    ExamYear {
        year,
        session: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_and_year() {
        assert_eq!(
            parse_year("juin 2019"),
            ExamYear {
                year: 2019,
                session: "Juin 2019".to_string()
            }
        );
        assert_eq!(parse_year("Session de Février 2021").session, "Février 2021");
        assert_eq!(parse_year("AOUT 2015").session, "Août 2015");
    }

    #[test]
    fn test_range_takes_latest() {
        assert_eq!(parse_year("2016-2022").year, 2022);
        assert_eq!(parse_year("2016-2022").session, "");
    }

    #[test]
    fn test_plain_year() {
        assert_eq!(parse_year(" 2018 ").year, 2018);
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(
            parse_year("inconnu"),
            ExamYear {
                year: 0,
                session: String::new()
            }
        );
    }
}
