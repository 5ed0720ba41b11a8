// src/engine/normalize/subject.rs

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::text::fold;

pub const MATHEMATIQUES: &str = "Mathématiques";
pub const PHYSIQUE: &str = "Physique";
pub const CHIMIE: &str = "Chimie";
pub const SVT: &str = "SVT";
pub const INFORMATIQUE: &str = "Informatique";
pub const FRANCAIS: &str = "Français";
pub const KREYOL: &str = "Kreyòl";
pub const ANGLAIS: &str = "Anglais";
pub const ESPAGNOL: &str = "Espagnol";
pub const PHILOSOPHIE: &str = "Philosophie";
pub const HISTOIRE_GEO: &str = "Histoire-Géographie";
pub const ECONOMIE: &str = "Économie";
pub const ART_MUSIQUE: &str = "Art et Musique";
pub const LITTERATURE: &str = "Littérature";
pub const SCIENCES_SOCIALES: &str = "Sciences Sociales";
pub const EDUCATION_CIVIQUE: &str = "Éducation Civique";

/// Subjects graded strictly: no fuzzy word matching.
pub const QUANTITATIVE_SUBJECTS: [&str; 5] = [MATHEMATIQUES, PHYSIQUE, CHIMIE, SVT, INFORMATIQUE];

/// Subjects whose papers are prose; stray math markup in them is cleaned on load.
pub const LANGUAGE_SUBJECTS: [&str; 8] = [
    FRANCAIS,
    KREYOL,
    ANGLAIS,
    ESPAGNOL,
    PHILOSOPHIE,
    HISTOIRE_GEO,
    ART_MUSIQUE,
    LITTERATURE,
];

/// Folded raw label -> canonical subject.
///
/// Keys are lowercase and accent-free; scan artifacts (rn for m, l for i,
/// 9 for ç) are listed as they appear in the catalog.
static SUBJECT_ALIASES: &[(&str, &str)] = &[
    ("mathematiques", MATHEMATIQUES),
    ("mathematique", MATHEMATIQUES),
    ("maths", MATHEMATIQUES),
    ("math", MATHEMATIQUES),
    ("mathematics", MATHEMATIQUES),
    ("matematik", MATHEMATIQUES),
    ("mathematiques (smp)", MATHEMATIQUES),
    ("mathematiques (svt)", MATHEMATIQUES),
    ("mathematiques (ses)", MATHEMATIQUES),
    ("mathematiques smp", MATHEMATIQUES),
    ("mathematiques svt", MATHEMATIQUES),
    ("mathematiques topographie", MATHEMATIQUES),
    ("mathernatiques", MATHEMATIQUES),
    ("mathematlques", MATHEMATIQUES),
    ("algebre", MATHEMATIQUES),
    ("geometrie", MATHEMATIQUES),
    ("physique", PHYSIQUE),
    ("physics", PHYSIQUE),
    ("fizik", PHYSIQUE),
    ("physique (smp)", PHYSIQUE),
    ("physique (svt)", PHYSIQUE),
    ("physique smp", PHYSIQUE),
    ("physique svt", PHYSIQUE),
    ("sciences physiques", PHYSIQUE),
    ("phisique", PHYSIQUE),
    ("physlque", PHYSIQUE),
    ("chimie", CHIMIE),
    ("chemistry", CHIMIE),
    ("chimi", CHIMIE),
    ("chimie (svt, smp)", CHIMIE),
    ("chimie (svt smp)", CHIMIE),
    ("chimie (svt)", CHIMIE),
    ("chimie (smp)", CHIMIE),
    ("chimie svt", CHIMIE),
    ("chimie smp", CHIMIE),
    ("chimle", CHIMIE),
    ("chlmie", CHIMIE),
    ("svt", SVT),
    ("s.v.t", SVT),
    ("s.v.t.", SVT),
    ("sciences de la vie et de la terre", SVT),
    ("biologie", SVT),
    ("biology", SVT),
    ("biyoloji", SVT),
    ("geologie", SVT),
    ("biologie-geologie", SVT),
    ("biologie et geologie", SVT),
    ("anatomie", SVT),
    ("zoologie", SVT),
    ("sciences naturelles", SVT),
    ("sciences experimentales", SVT),
    ("informatique", INFORMATIQUE),
    ("computer science", INFORMATIQUE),
    ("enfomatik", INFORMATIQUE),
    ("tic", INFORMATIQUE),
    ("informatique (tic)", INFORMATIQUE),
    ("francais", FRANCAIS),
    ("french", FRANCAIS),
    ("franse", FRANCAIS),
    ("langue francaise", FRANCAIS),
    ("communication francaise", FRANCAIS),
    ("fran9ais", FRANCAIS),
    ("kreyol", KREYOL),
    ("kreyol ayisyen", KREYOL),
    ("creole", KREYOL),
    ("creole haitien", KREYOL),
    ("kominikasyon kreyol", KREYOL),
    ("anglais", ANGLAIS),
    ("english", ANGLAIS),
    ("angle", ANGLAIS),
    ("langue anglaise", ANGLAIS),
    ("espagnol", ESPAGNOL),
    ("spanish", ESPAGNOL),
    ("espanol", ESPAGNOL),
    ("panyol", ESPAGNOL),
    ("langue espagnole", ESPAGNOL),
    ("philosophie", PHILOSOPHIE),
    ("philosophy", PHILOSOPHIE),
    ("philo", PHILOSOPHIE),
    ("filozofi", PHILOSOPHIE),
    ("histoire-geographie", HISTOIRE_GEO),
    ("histoire geographie", HISTOIRE_GEO),
    ("histoire et geographie", HISTOIRE_GEO),
    ("histoire-geo", HISTOIRE_GEO),
    ("histoire geo", HISTOIRE_GEO),
    ("histoire", HISTOIRE_GEO),
    ("geographie", HISTOIRE_GEO),
    ("istwa jewografi", HISTOIRE_GEO),
    ("istwa", HISTOIRE_GEO),
    ("economie", ECONOMIE),
    ("economics", ECONOMIE),
    ("ekonomi", ECONOMIE),
    ("sciences economiques", ECONOMIE),
    ("art et musique", ART_MUSIQUE),
    ("arts et musique", ART_MUSIQUE),
    ("art_musique", ART_MUSIQUE),
    ("musique", ART_MUSIQUE),
    ("arts plastiques", ART_MUSIQUE),
    ("education esthetique et artistique", ART_MUSIQUE),
    ("litterature", LITTERATURE),
    ("literature", LITTERATURE),
    ("litterature haitienne", LITTERATURE),
    ("litterature francaise", LITTERATURE),
    ("sciences sociales", SCIENCES_SOCIALES),
    ("social studies", SCIENCES_SOCIALES),
    ("sociologie", SCIENCES_SOCIALES),
    ("syans sosyal", SCIENCES_SOCIALES),
    ("connaissances generales", SCIENCES_SOCIALES),
    ("culture generale", SCIENCES_SOCIALES),
    ("education civique", EDUCATION_CIVIQUE),
    ("education civique et morale", EDUCATION_CIVIQUE),
    ("civisme", EDUCATION_CIVIQUE),
    ("ethique", EDUCATION_CIVIQUE),
];

static SUBJECT_TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUBJECT_ALIASES.iter().copied().collect());

static TRAILING_PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid parenthetical regex"));

/// Canonical subject for a raw label, if the label is known.
///
/// A trailing parenthetical ("Chimie (NS4)") is dropped on a second attempt.
pub fn canonical_subject(raw: &str) -> Option<&'static str> {
    let key = fold(raw);
    if key.is_empty() {
        return None;
    }
    if let Some(canonical) = SUBJECT_TABLE.get(key.as_str()).copied() {
        return Some(canonical);
    }
    let bare = TRAILING_PARENTHETICAL.replace(&key, "");
    SUBJECT_TABLE.get(&*bare).copied()
}

/// Maps a raw subject label to its display name; unknown labels pass through trimmed.
pub fn normalize_subject(raw: &str) -> String {
    canonical_subject(raw)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Every folded label that maps to `canonical`.
pub fn aliases_of(canonical: &str) -> impl Iterator<Item = &'static str> + '_ {
    SUBJECT_ALIASES
        .iter()
        .filter(move |(_, target)| *target == canonical)
        .map(|(alias, _)| *alias)
}

/// Mathematics, physics, chemistry, life-and-earth science and informatics.
pub fn is_quantitative(subject: &str) -> bool {
    canonical_subject(subject).is_some_and(|s| QUANTITATIVE_SUBJECTS.contains(&s))
}

pub fn is_language(subject: &str) -> bool {
    canonical_subject(subject).is_some_and(|s| LANGUAGE_SUBJECTS.contains(&s))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: [&str; 16] = [
        MATHEMATIQUES,
        PHYSIQUE,
        CHIMIE,
        SVT,
        INFORMATIQUE,
        FRANCAIS,
        KREYOL,
        ANGLAIS,
        ESPAGNOL,
        PHILOSOPHIE,
        HISTOIRE_GEO,
        ECONOMIE,
        ART_MUSIQUE,
        LITTERATURE,
        SCIENCES_SOCIALES,
        EDUCATION_CIVIQUE,
    ];

    #[test]
    fn test_known_variants() {
        assert_eq!(normalize_subject("MATHEMATIQUES"), MATHEMATIQUES);
        assert_eq!(normalize_subject("Chimie (SVT, SMP)"), CHIMIE);
        assert_eq!(normalize_subject("  Histoire-Géo "), HISTOIRE_GEO);
        assert_eq!(normalize_subject("Biologie"), SVT);
        assert_eq!(normalize_subject("Kreyòl"), KREYOL);
        assert_eq!(normalize_subject("Mathernatiques"), MATHEMATIQUES);
    }

    #[test]
    fn test_trailing_parenthetical_retry() {
        assert_eq!(normalize_subject("Physique (NS4)"), PHYSIQUE);
    }

    #[test]
    fn test_unknown_passthrough() {
        assert_eq!(normalize_subject("  Astronomie  "), "Astronomie");
        assert_eq!(normalize_subject(""), "");
    }

    #[test]
    fn test_canonical_is_idempotent() {
        for canonical in CANONICAL {
            assert_eq!(normalize_subject(canonical), canonical);
            assert_eq!(
                normalize_subject(&normalize_subject(canonical)),
                canonical
            );
        }
    }

    #[test]
    fn test_every_alias_targets_a_canonical_subject() {
        for (_, target) in SUBJECT_ALIASES {
            assert!(CANONICAL.contains(target), "{} is not canonical", target);
        }
    }

    #[test]
    fn test_quantitative() {
        assert!(is_quantitative("Mathématiques"));
        assert!(is_quantitative("chimie (svt, smp)"));
        assert!(is_quantitative("Informatique"));
        assert!(!is_quantitative("Histoire-Géo"));
        assert!(!is_quantitative("Philosophie"));
        assert!(!is_quantitative("unknown"));
    }

    #[test]
    fn test_language() {
        assert!(is_language("English"));
        assert!(is_language("Histoire-Géo"));
        assert!(is_language("philo"));
        assert!(!is_language("Mathématiques"));
        assert!(!is_language("Économie"));
        assert!(!is_language("unknown"));
    }
}
