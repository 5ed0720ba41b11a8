// src/engine/repair.rs

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{
    engine::normalize::is_language,
    models::exam::{AnswerPart, Exam, Question, QuestionType},
};

/// `$9^{th}$`, `$21^{st}$`.
static LATEX_ORDINAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\d+)\^\{(th|st|nd|rd)\}\$").expect("valid ordinal regex")
});
static LATEX_UNDERLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\\underline\{([^}]+)\}\$").expect("valid underline regex")
});
static LATEX_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[:,;]").expect("valid spacing regex"));
static LATEX_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[A-Za-z]+").expect("valid command regex"));

const OPTION_KEYS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

/// Answer texts that stand for "no answer key".
const PLACEHOLDER_ANSWERS: [&str; 6] = [
    "cannot be determined",
    "incomplete question",
    "n/a",
    "no model answer available",
    "cannot be determined from provided text",
    "",
];

/// Labels under which an answer part names the right option.
const CORRECT_OPTION_LABELS: [&str; 7] = [
    "correct option",
    "option",
    "correct",
    "réponse correcte",
    "option correcte",
    "opción correcta",
    "respuesta correcta",
];

/// How many questions each fix touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub type_inferred: usize,
    pub mcq_key_from_final: usize,
    pub mcq_key_from_parts: usize,
    pub mcq_text_to_key: usize,
    pub fill_blank_key: usize,
    pub true_false_key: usize,
    pub language_latex_cleaned: usize,
}

impl RepairStats {
    pub fn total(&self) -> usize {
        self.type_inferred
            + self.mcq_key_from_final
            + self.mcq_key_from_parts
            + self.mcq_text_to_key
            + self.fill_blank_key
            + self.true_false_key
            + self.language_latex_cleaned
    }
}

fn infer_type(question: &Question) -> QuestionType {
    let text = question.question.to_lowercase();
    if !question.options.is_empty() {
        QuestionType::MultipleChoice
    } else if ["dissertation", "rédiger", "write"]
        .iter()
        .any(|w| text.contains(w))
    {
        QuestionType::Essay
    } else {
        QuestionType::ShortAnswer
    }
}

/// Option key whose text equals `text`, ignoring case.
fn key_for_text(options: &BTreeMap<String, String>, text: &str) -> Option<String> {
    let text = text.trim().to_lowercase();
    options
        .iter()
        .find(|(_, value)| value.trim().to_lowercase() == text)
        .map(|(key, _)| key.clone())
}

/// Option key named by a final answer: "b", "b) Port-au-Prince", or the option text itself.
fn key_from_final(final_answer: &str, options: &BTreeMap<String, String>) -> Option<String> {
    let lowered = final_answer.trim().to_lowercase();
    let mut chars = lowered.chars();
    let first = chars.next()?;
    let second = chars.next();

    if OPTION_KEYS.contains(&lowered.as_str()) {
        return Some(lowered);
    }
    if ('a'..='f').contains(&first) && second.is_some_and(|c| ".):, ".contains(c)) {
        return Some(first.to_string());
    }
    key_for_text(options, &lowered)
}

fn key_from_parts(parts: &[AnswerPart], options: &BTreeMap<String, String>) -> Option<String> {
    let answer = parts
        .iter()
        .find(|p| CORRECT_OPTION_LABELS.contains(&p.label.trim().to_lowercase().as_str()))
        .map(|p| p.answer.trim().to_lowercase())
        .filter(|a| !a.is_empty())?;
    if OPTION_KEYS.contains(&answer.as_str()) {
        return Some(answer);
    }
    key_for_text(options, &answer)
}

/// Replaces an option text held in `correct` by its key: exact text first, then containment.
fn text_to_key(correct: &str, options: &BTreeMap<String, String>) -> Option<String> {
    let lowered = correct.trim().to_lowercase();
    if options.keys().any(|k| k.to_lowercase() == lowered) {
        return None;
    }
    key_for_text(options, &lowered).or_else(|| {
        options
            .iter()
            .find(|(_, value)| value.to_lowercase().contains(&lowered))
            .map(|(key, _)| key.clone())
    })
}

fn is_placeholder(answer: &str) -> bool {
    PLACEHOLDER_ANSWERS.contains(&answer.trim().to_lowercase().as_str())
}

fn true_false_key(final_answer: &str) -> Option<String> {
    let lowered = final_answer.trim().to_lowercase();
    if ["vrai", "faux", "true", "false", "v", "f"].contains(&lowered.as_str()) {
        Some(lowered)
    } else if lowered.contains("vrai") {
        Some("vrai".to_string())
    } else if lowered.contains("faux") {
        Some("faux".to_string())
    } else {
        None
    }
}

/// Math markup left in prose: ordinals and underlines become plain text, `\\ldots` becomes `...`.
pub fn clean_language_latex(text: &str) -> String {
    let text = LATEX_ORDINAL.replace_all(text, "$1$2");
    let text = LATEX_UNDERLINE.replace_all(&text, |caps: &Captures| {
        let inner = LATEX_SPACING.replace_all(&caps[1], " ");
        let inner = inner.replace("\\text{", "").replace('}', "");
        LATEX_COMMAND.replace_all(&inner, "").trim().to_string()
    });
    text.replace("$\\ldots$", "...").replace("\\ldots", "...")
}

/// Cleans the prose fields of a question from a language paper.
pub fn repair_language_question(question: &mut Question, stats: &mut RepairStats) {
    let mut changed = false;
    let cleaned = clean_language_latex(&question.question);
    if cleaned != question.question {
        question.question = cleaned;
        changed = true;
    }
    if let Some(scaffold) = question.scaffold_text.as_mut() {
        let cleaned = clean_language_latex(scaffold);
        if cleaned != *scaffold {
            *scaffold = cleaned;
            changed = true;
        }
    }
    if changed {
        stats.language_latex_cleaned += 1;
    }
}

/// Fills in what the catalog authors left out of one question.
pub fn repair_question(question: &mut Question, stats: &mut RepairStats) {
    if question.question_type.is_none() {
        question.question_type = Some(infer_type(question));
        stats.type_inferred += 1;
    }

    let final_answer = question.final_answer().map(str::to_string);

    match question.kind() {
        QuestionType::MultipleChoice => {
            if question.correct_answer().is_none() {
                if let Some(key) = final_answer
                    .as_deref()
                    .and_then(|f| key_from_final(f, &question.options))
                {
                    question.correct = Some(key);
                    stats.mcq_key_from_final += 1;
                } else if let Some(key) = key_from_parts(&question.answer_parts, &question.options)
                {
                    question.correct = Some(key);
                    stats.mcq_key_from_parts += 1;
                }
            }
            if let Some(key) = question
                .correct_answer()
                .filter(|_| !question.options.is_empty())
                .and_then(|c| text_to_key(c, &question.options))
            {
                question.correct = Some(key);
                stats.mcq_text_to_key += 1;
            }
        }
        QuestionType::FillBlank if question.correct_answer().is_none() => {
            let key = final_answer.filter(|f| !is_placeholder(f)).or_else(|| {
                question
                    .answer_parts
                    .iter()
                    .map(|p| p.answer.trim())
                    .find(|a| !is_placeholder(a))
                    .map(str::to_string)
            });
            if let Some(key) = key {
                question.correct = Some(key);
                stats.fill_blank_key += 1;
            }
        }
        QuestionType::TrueFalse if question.correct_answer().is_none() => {
            if let Some(key) = final_answer.as_deref().and_then(true_false_key) {
                question.correct = Some(key);
                stats.true_false_key += 1;
            }
        }
        _ => {}
    }
}

/// Repairs every question of every exam and logs what was fixed.
pub fn repair_catalog(exams: &mut [Exam]) -> RepairStats {
    let mut stats = RepairStats::default();
    for exam in exams.iter_mut() {
        let language = is_language(&exam.subject);
        for question in exam
            .sections
            .iter_mut()
            .flat_map(|s| s.questions.iter_mut())
        {
            repair_question(question, &mut stats);
            if language {
                repair_language_question(question, &mut stats);
            }
        }
    }

    tracing::info!(
        "Catalog repair: {} types inferred, {} MCQ keys from final answers, {} from answer parts, \
         {} MCQ texts turned into keys, {} fill-blank keys, {} true/false keys, \
         {} language questions cleaned of LaTeX",
        stats.type_inferred,
        stats.mcq_key_from_final,
        stats.mcq_key_from_parts,
        stats.mcq_text_to_key,
        stats.fill_blank_key,
        stats.true_false_key,
        stats.language_latex_cleaned
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> BTreeMap<String, String> {
        [("a", "Jacmel"), ("b", "Port-au-Prince"), ("c", "Cap-Haïtien")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn mcq() -> Question {
        Question {
            question_type: Some(QuestionType::MultipleChoice),
            options: options(),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_inference() {
        let mut stats = RepairStats::default();

        let mut q = Question {
            options: options(),
            ..Default::default()
        };
        repair_question(&mut q, &mut stats);
        assert_eq!(q.kind(), QuestionType::MultipleChoice);

        let mut q = Question {
            question: "Rédiger une dissertation sur la liberté.".to_string(),
            ..Default::default()
        };
        repair_question(&mut q, &mut stats);
        assert_eq!(q.kind(), QuestionType::Essay);

        let mut q = Question::default();
        repair_question(&mut q, &mut stats);
        assert_eq!(q.kind(), QuestionType::ShortAnswer);
        assert_eq!(stats.type_inferred, 3);
    }

    #[test]
    fn test_mcq_key_from_final_answer() {
        let mut stats = RepairStats::default();
        for (final_answer, expected) in [("B", "b"), ("b) Port-au-Prince", "b"), ("cap-haïtien", "c")] {
            let mut q = mcq();
            q.final_answer = Some(final_answer.to_string());
            repair_question(&mut q, &mut stats);
            assert_eq!(q.correct.as_deref(), Some(expected), "{}", final_answer);
        }
        assert_eq!(stats.mcq_key_from_final, 3);
    }

    #[test]
    fn test_mcq_key_from_parts() {
        let mut stats = RepairStats::default();
        let mut q = mcq();
        q.answer_parts = vec![AnswerPart {
            label: "Correct option".to_string(),
            answer: "Jacmel".to_string(),
            alternatives: Vec::new(),
        }];
        repair_question(&mut q, &mut stats);
        assert_eq!(q.correct.as_deref(), Some("a"));
        assert_eq!(stats.mcq_key_from_parts, 1);
    }

    #[test]
    fn test_mcq_text_to_key() {
        let mut stats = RepairStats::default();
        let mut q = mcq();
        q.correct = Some("Port-au".to_string());
        repair_question(&mut q, &mut stats);
        assert_eq!(q.correct.as_deref(), Some("b"));

        let mut q = mcq();
        q.correct = Some("C".to_string());
        repair_question(&mut q, &mut stats);
        assert_eq!(q.correct.as_deref(), Some("C"));
        assert_eq!(stats.mcq_text_to_key, 1);
    }

    #[test]
    fn test_fill_blank_skips_placeholders() {
        let mut stats = RepairStats::default();
        let mut q = Question {
            question_type: Some(QuestionType::FillBlank),
            final_answer: Some("N/A".to_string()),
            answer_parts: vec![AnswerPart {
                label: String::new(),
                answer: "went".to_string(),
                alternatives: Vec::new(),
            }],
            ..Default::default()
        };
        repair_question(&mut q, &mut stats);
        assert_eq!(q.correct.as_deref(), Some("went"));
        assert_eq!(stats.fill_blank_key, 1);
    }

    #[test]
    fn test_true_false_from_final_answer() {
        let mut stats = RepairStats::default();
        let mut q = Question {
            question_type: Some(QuestionType::TrueFalse),
            final_answer: Some("C'est faux, car...".to_string()),
            ..Default::default()
        };
        repair_question(&mut q, &mut stats);
        assert_eq!(q.correct.as_deref(), Some("faux"));
    }

    #[test]
    fn test_clean_language_latex() {
        assert_eq!(
            clean_language_latex("On the $9^{th}$ of May and the $21^{st}$ day"),
            "On the 9th of May and the 21st day"
        );
        assert_eq!(
            clean_language_latex("Underline: $\\underline{\\:\\:went\\:\\:}$ home"),
            "Underline: went home"
        );
        assert_eq!(clean_language_latex("He said $\\ldots$ then \\ldots"), "He said ... then ...");
        assert_eq!(clean_language_latex("x^{2} = 4"), "x^{2} = 4");
    }

    #[test]
    fn test_catalog_cleans_language_papers_only() {
        let mut exams: Vec<Exam> = serde_json::from_value(serde_json::json!([
            { "subject": "English", "sections": [{ "questions": [
                { "type": "fill_blank", "correct": "went",
                  "question": "The $1^{st}$ blank $\\ldots$",
                  "scaffold_text": "I $\\underline{\\;went}$ ____" }
            ]}]},
            { "subject": "Maths", "sections": [{ "questions": [
                { "type": "calculation", "correct": "9", "question": "Le $9^{th}$ terme $\\ldots$" }
            ]}]}
        ]))
        .unwrap();
        let stats = repair_catalog(&mut exams);

        let english = &exams[0].sections[0].questions[0];
        assert_eq!(english.question, "The 1st blank ...");
        assert_eq!(english.scaffold_text.as_deref(), Some("I went ____"));
        assert_eq!(exams[1].sections[0].questions[0].question, "Le $9^{th}$ terme $\\ldots$");
        assert_eq!(stats.language_latex_cleaned, 1);
    }

    #[test]
    fn test_repair_is_stable() {
        let mut q = mcq();
        q.final_answer = Some("b".to_string());
        let mut first = RepairStats::default();
        repair_question(&mut q, &mut first);
        let mut second = RepairStats::default();
        repair_question(&mut q, &mut second);
        assert_eq!(second.total(), 0);
    }
}
