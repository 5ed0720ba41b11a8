// src/engine/normalize/level.rs

use crate::utils::text::fold;

pub const NEUVIEME: &str = "9e Année";
pub const TERMINALE: &str = "Terminale";
pub const UNIVERSITE: &str = "Université";

/// One row per level: folded aliases -> display name.
static LEVELS: [(&[&str], &str); 3] = [
    (
        &["9e annee", "9e", "9eme annee", "9eme", "9e af", "9af", "neuvieme annee"],
        NEUVIEME,
    ),
    (
        &["terminale", "ns4", "nouveau secondaire iv", "rheto", "bac", "baccalaureat"],
        TERMINALE,
    ),
    (&["universite", "university", "inivesite"], UNIVERSITE),
];

/// Maps a raw level label to its display name; unknown labels pass through trimmed.
pub fn normalize_level(raw: &str) -> String {
    let key = fold(raw);
    LEVELS
        .iter()
        .find(|(aliases, canonical)| aliases.contains(&key.as_str()) || fold(canonical) == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Guesses the level from a title when the exam carries none.
pub fn level_from_title(title: &str) -> &'static str {
    if title.contains("9e") || title.contains("9AF") {
        NEUVIEME
    } else if ["Terminale", "Philo", "NS", "SVT"]
        .iter()
        .any(|marker| title.contains(marker))
    {
        TERMINALE
    } else {
        UNIVERSITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("9e AF"), NEUVIEME);
        assert_eq!(normalize_level("NS4"), TERMINALE);
        assert_eq!(normalize_level("universite"), UNIVERSITE);
        assert_eq!(normalize_level(" Seconde "), "Seconde");
    }

    #[test]
    fn test_normalize_level_idempotent() {
        for level in [NEUVIEME, TERMINALE, UNIVERSITE] {
            assert_eq!(normalize_level(level), level);
        }
    }

    #[test]
    fn test_level_from_title() {
        assert_eq!(level_from_title("Examen de 9e Année (2018)"), NEUVIEME);
        assert_eq!(level_from_title("Bac Philo 2019"), TERMINALE);
        assert_eq!(level_from_title("Chimie NS4"), TERMINALE);
        assert_eq!(level_from_title("Calcul intégral"), UNIVERSITE);
    }
}
