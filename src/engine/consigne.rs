// src/engine/consigne.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{
    config::{MIN_RULE_SENTENCES, RULE_SENTENCE_MAX_CHARS},
    utils::text::fold,
};

/// Administrative vocabulary, matched against folded (lowercase, accent-free) text.
static RULE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:calculatrices?|calculettes?|telephones?|portables?|cellulaires?|interdit(?:e|s|es)?|silence|obligatoires?|duree|coefficient|aucun document|documents? (?:non )?autorises?|brouillons?|autorise(?:e|s|es)?|fraude|tricherie|kalkilatris|telefon|entedi|obligatwa|calculators?|phones?|forbidden|prohibited|mandatory|allowed)\b",
    )
    .expect("valid rule keyword regex")
});

/// A letter, a period, then whitespace before a list marker or a capital.
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{L}\.\s+(\d+[.)]|\p{Lu})").expect("valid sentence boundary regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsigneSplit {
    pub rules: Vec<String>,
    pub cleaned_text: String,
}

/// Splits one line into sentence-like units.
fn split_sentences(line: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    while let Some(next) = SENTENCE_BOUNDARY
        .captures_at(line, start)
        .and_then(|caps| caps.get(1))
    {
        let unit = line[start..next.start()].trim();
        if !unit.is_empty() {
            units.push(unit);
        }
        // Resume at the opening capital: it may close the next sentence ("B. C").
        start = next.start();
    }
    let tail = line[start..].trim();
    if !tail.is_empty() {
        units.push(tail);
    }
    units
}

fn is_rule(sentence: &str) -> bool {
    sentence.chars().count() < RULE_SENTENCE_MAX_CHARS && RULE_KEYWORDS.is_match(&fold(sentence))
}

/// Separates administrative consignes from pedagogical content.
///
/// Classification is only applied when at least two rule sentences are found;
/// otherwise the trimmed input comes back untouched with no rules.
pub fn parse_consignes(text: &str) -> ConsigneSplit {
    let trimmed = text.trim();
    let mut rules = Vec::new();
    let mut kept_lines = Vec::new();

    for line in trimmed.lines() {
        let mut kept = Vec::new();
        for sentence in split_sentences(line) {
            if is_rule(sentence) {
                rules.push(sentence.to_string());
            } else {
                kept.push(sentence);
            }
        }
        if !kept.is_empty() {
            kept_lines.push(kept.join(" "));
        } else if line.trim().is_empty() {
            kept_lines.push(String::new());
        }
    }

    if rules.len() < MIN_RULE_SENTENCES {
        return ConsigneSplit {
            rules: Vec::new(),
            cleaned_text: trimmed.to_string(),
        };
    }

    tracing::debug!("Extracted {} consignes", rules.len());
    ConsigneSplit {
        rules,
        cleaned_text: kept_lines.join("\n").trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rule_is_content() {
        let text = "  Un élève utilise sa calculatrice pour trouver la racine de 2.  ";
        let split = parse_consignes(text);
        assert!(split.rules.is_empty());
        assert_eq!(split.cleaned_text, text.trim());
    }

    #[test]
    fn test_two_rules_are_removed() {
        let text = "Calculatrice interdite. Le silence est obligatoire.\nExercice 1 : Résoudre l'équation.";
        let split = parse_consignes(text);
        assert_eq!(
            split.rules,
            vec!["Calculatrice interdite.", "Le silence est obligatoire."]
        );
        assert_eq!(split.cleaned_text, "Exercice 1 : Résoudre l'équation.");
    }

    #[test]
    fn test_numbered_consignes() {
        let text = "1. L'usage de la calculatrice est interdit. 2. Les téléphones portables sont interdits. 3. Traitez le sujet suivant.";
        let split = parse_consignes(text);
        assert_eq!(split.rules.len(), 2);
        assert_eq!(split.cleaned_text, "3. Traitez le sujet suivant.");
    }

    #[test]
    fn test_long_sentence_is_never_a_rule() {
        let long = format!("La calculatrice est interdite {}.", "et ainsi de suite ".repeat(20));
        let text = format!("{}\nSilence obligatoire.", long);
        let split = parse_consignes(&text);
        assert!(split.rules.is_empty());
        assert_eq!(split.cleaned_text, text);
    }

    #[test]
    fn test_split_sentences_keeps_abbreviated_numbers() {
        assert_eq!(
            split_sentences("Lire le texte. Répondre aux questions 1. et 2."),
            vec!["Lire le texte.", "Répondre aux questions 1. et 2."]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            parse_consignes("   "),
            ConsigneSplit {
                rules: Vec::new(),
                cleaned_text: String::new()
            }
        );
    }
}
