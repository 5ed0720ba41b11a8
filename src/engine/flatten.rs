// src/engine/flatten.rs

use std::{collections::BTreeMap, ops::Range};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::exam::{Exam, Question, QuestionType, ScaffoldBlank};

static SUB_EX_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]+(?:\.[A-Z]+)*)[.\-)]?\s*\d+").expect("valid sub-exercise regex")
});
static SINGLE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z])[.)]?$").expect("valid single letter regex"));

/// "A. Write the correct form of the verbs (10%)" followed by the body.
static LETTERED_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Z][.)]\s*[^\n]{5,})\n+((?s).*\S.*)$").expect("valid directive regex")
});

/// Instructional first line followed by a body, without a letter prefix.
static FALLBACK_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*((?:(?:fill|choose|complete|change|put|read|write|match|answer|translate|identify|turn|rewrite|give|use|explain|find|underline|define|circle|correct|combine|transform|classify|list|name|compl[ée]tez|choisissez|r[ée]pondez|lisez|[ée]crivez|traduisez|soulignez|reliez|mettez|conjuguez|trouvez|remplissez)\b[^\n]*|[^\n]{5,}:|[^\n]{5,}\(\s*\d+\s*(?:pts?|%|points?|marks?)\.*\s*\)))\s*\n+((?s).*\S.*)$",
    )
    .expect("valid fallback directive regex")
});

static DIRECTIVE_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(\s*\d+(?:[.,]\d+)?\s*(?:%|pts?|points?|marks?)\.*\s*\)\s*$|\s+\d+\s*%\s*$")
        .expect("valid annotation regex")
});

static WORD_POOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*(?:word\s+pool|word\s+bank|banque\s+de\s+mots|mots)\s*:\s*([^)]*)\)")
        .expect("valid word pool regex")
});

static LEADING_SUB_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d{1,2}|[A-Za-z])[.)]\s+").expect("valid sub-number regex"));
static LEADING_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(\s*\d+\s*%\s*\)\s*").expect("valid percentage regex"));
static TRAILING_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\s*\d+\s*%\s*\)\s*$").expect("valid percentage regex"));

static TRAILING_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid trailing space regex"));
static BLANK_LINE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// A question with its section context and display-ready text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatQuestion {
    /// Position in the whole exam; answers and results are keyed by it.
    pub index: usize,
    pub section_index: usize,
    pub section_title: String,
    pub section_instructions: String,

    #[serde(flatten)]
    pub question: Question,

    #[serde(rename = "_displayText")]
    pub display_text: String,
    #[serde(rename = "_subExGroup")]
    pub sub_ex_group: Option<String>,
    #[serde(rename = "_subExDirective")]
    pub sub_ex_directive: Option<String>,
    #[serde(rename = "_wordPool")]
    pub word_pool: Vec<String>,
    #[serde(rename = "_displayNumber")]
    pub display_number: String,
}

/// Sub-exercise key of a display number: "II.A.3" -> "II.A", "B" -> "B", "5" -> none.
pub fn sub_exercise_key(number: Option<&str>) -> Option<String> {
    let number = number?.trim();
    SUB_EX_PREFIX
        .captures(number)
        .or_else(|| SINGLE_LETTER.captures(number))
        .map(|caps| caps[1].to_string())
}

/// Drops the first non-blank line when the second non-blank line repeats it.
pub fn dedup_first_line(text: &str) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    let non_blank: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, _)| i)
        .take(2)
        .collect();
    if let [first, second] = non_blank[..] {
        if lines[first].trim() == lines[second].trim() {
            lines.remove(first);
        }
    }
    lines.join("\n")
}

/// Trailing spaces removed, blank line runs capped at one empty line.
pub fn tidy_text(text: &str) -> String {
    let text = dedup_first_line(text);
    let text = TRAILING_SPACES.replace_all(&text, "");
    BLANK_LINE_RUNS.replace_all(&text, "\n\n").into_owned()
}

/// Splits a leading directive line off the question body.
fn split_directive(text: &str) -> Option<(String, String)> {
    let caps = LETTERED_DIRECTIVE
        .captures(text)
        .or_else(|| FALLBACK_DIRECTIVE.captures(text))?;
    let directive = DIRECTIVE_ANNOTATION.replace(caps[1].trim(), "").trim().to_string();
    let body = caps[2].to_string();
    if directive.is_empty() {
        return None;
    }
    Some((directive, body))
}

fn extract_word_pool(text: &str) -> (Vec<String>, String) {
    let Some(caps) = WORD_POOL.captures(text) else {
        return (Vec::new(), text.to_string());
    };
    let words = caps[1]
        .split([',', ';', '/', '|'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    (words, WORD_POOL.replace(text, "").into_owned())
}

struct CleanedText {
    display_text: String,
    directive: Option<String>,
    word_pool: Vec<String>,
}

fn clean_question_text(raw: &str, first_in_group: bool) -> CleanedText {
    let mut text = tidy_text(raw);

    let mut directive = None;
    if first_in_group {
        if let Some((found, body)) = split_directive(&text) {
            directive = Some(found);
            text = body;
        }
    }

    let (word_pool, text) = extract_word_pool(&text);
    let text = LEADING_SUB_NUMBER.replace(&text, "");
    let text = LEADING_PERCENT.replace(&text, "");
    let text = TRAILING_PERCENT.replace(&text, "");

    CleanedText {
        display_text: text.trim().to_string(),
        directive,
        word_pool,
    }
}

/// Flattens an exam into document order with section context and cleaned text.
///
/// Sub-exercise groups never span sections; the directive is only looked for
/// on the first question of a group, and every ungrouped question is its own group.
pub fn flatten(exam: &Exam) -> Vec<FlatQuestion> {
    let mut flat: Vec<FlatQuestion> = Vec::new();

    for (section_index, section) in exam.sections.iter().enumerate() {
        let mut previous_key: Option<String> = None;

        for question in &section.questions {
            let index = flat.len();
            let key = sub_exercise_key(question.number.as_deref());
            // Ungrouped questions are groups of one.
            let first_in_group = key.is_none() || key != previous_key;

            let cleaned = clean_question_text(&question.question, first_in_group);
            let display_number = question
                .number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| (index + 1).to_string());

            flat.push(FlatQuestion {
                index,
                section_index,
                section_title: section.section_title.clone(),
                section_instructions: section.instructions.clone(),
                question: question.clone(),
                display_text: cleaned.display_text,
                sub_ex_group: key.clone(),
                sub_ex_directive: cleaned.directive,
                word_pool: cleaned.word_pool,
                display_number,
            });
            previous_key = key;
        }
    }

    flat
}

/// Contiguous index ranges of each sub-exercise group, singletons included.
pub fn group_runs(flat: &[FlatQuestion]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for (i, q) in flat.iter().enumerate() {
        let continues = i > 0 && {
            let prev = &flat[i - 1];
            q.sub_ex_group.is_some()
                && prev.sub_ex_group == q.sub_ex_group
                && prev.section_index == q.section_index
        };
        match runs.last_mut() {
            Some(run) if continues => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

/// What a candidate sees of a question: no answer keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub index: usize,
    pub section_index: usize,
    pub display_number: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: BTreeMap<String, String>,
    pub points: f64,
    pub sub_ex_group: Option<String>,
    pub sub_ex_directive: Option<String>,
    pub word_pool: Vec<String>,
    pub scaffold_text: Option<String>,
    pub scaffold_blanks: Vec<ScaffoldBlank>,
    pub has_figure: bool,
    pub figure_description: Option<String>,
}

impl From<&FlatQuestion> for PublicQuestion {
    fn from(flat: &FlatQuestion) -> Self {
        let q = &flat.question;
        Self {
            index: flat.index,
            section_index: flat.section_index,
            display_number: flat.display_number.clone(),
            question_type: q.kind(),
            text: flat.display_text.clone(),
            options: q.options.clone(),
            points: q.max_points(),
            sub_ex_group: flat.sub_ex_group.clone(),
            sub_ex_directive: flat.sub_ex_directive.clone(),
            word_pool: flat.word_pool.clone(),
            scaffold_text: q.scaffold_text.clone(),
            scaffold_blanks: q.scaffold_blanks.clone(),
            has_figure: q.has_figure,
            figure_description: q.figure_description.clone(),
        }
    }
}
