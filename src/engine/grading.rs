// src/engine/grading.rs

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    coefficients::CoefficientSource,
    engine::{
        flatten::{FlatQuestion, flatten},
        matcher::{self, MatchOptions},
    },
    models::{
        answer::AnswerEnvelope,
        exam::{Exam, Question, QuestionType},
        grade::{GradeReport, GradeStatus, PreGraded, QuestionResult, Summary},
    },
    utils::text::fold,
};

const TRUE_WORDS: [&str; 8] = ["vrai", "v", "true", "t", "yes", "oui", "wi", "vre"];
const FALSE_WORDS: [&str; 7] = ["faux", "f", "false", "no", "non", "fo", "fos"];

/// Exam-wide inputs of a grading pass.
#[derive(Clone, Copy, Default)]
pub struct GradingContext<'a> {
    /// Raw or canonical subject; decides whether fuzzy matching is allowed.
    pub subject: &'a str,
    /// Bac track for coefficient weighting.
    pub track: Option<&'a str>,
    pub coefficients: Option<&'a dyn CoefficientSource>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn result(index: usize, status: GradeStatus, awarded: f64, max_points: f64) -> QuestionResult {
    QuestionResult {
        index,
        status,
        awarded,
        max_points,
        pre_graded: false,
    }
}

/// Alternatives taken from the answer parts: each part's answer and its variants.
fn part_alternatives(question: &Question) -> Vec<String> {
    question
        .answer_parts
        .iter()
        .flat_map(|p| std::iter::once(p.answer.clone()).chain(p.alternatives.iter().cloned()))
        .filter(|a| !a.trim().is_empty())
        .collect()
}

fn option_key(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', ')', ':'])
        .trim()
        .to_lowercase()
}

/// Keys of a multi-select answer: a JSON array or a comma/space separated list.
fn selected_keys(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let listed: Vec<String> = if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(values) => values
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect(),
            Err(e) => {
                tracing::debug!("Multi-select answer is not a JSON array: {}", e);
                split_keys(trimmed.trim_matches(['[', ']']))
            }
        }
    } else {
        split_keys(trimmed)
    };

    let mut keys: Vec<String> = listed
        .iter()
        .map(|k| option_key(k.trim_matches('"')))
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split([',', ';', ' '])
        .map(str::to_string)
        .collect()
}

fn truth_value(raw: &str) -> Option<bool> {
    let key = fold(raw.trim_end_matches(['.', '!']));
    if TRUE_WORDS.contains(&key.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&key.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn true_false_matches(user: &str, expected: &str) -> bool {
    match (truth_value(user), truth_value(expected)) {
        (Some(u), Some(e)) => u == e,
        _ => fold(user) == fold(expected),
    }
}

/// Grades the scaffold blanks one by one against the answer parts.
fn grade_scaffold(
    index: usize,
    question: &Question,
    values: &[String],
    options: MatchOptions<'_>,
) -> Option<QuestionResult> {
    let points = question.max_points();

    if !question.answer_parts.is_empty() {
        let total = question.answer_parts.len();
        let correct = question
            .answer_parts
            .iter()
            .enumerate()
            .filter(|(i, part)| {
                values.get(*i).is_some_and(|value| {
                    matcher::matches(value, &part.answer, &part.alternatives, options)
                })
            })
            .count();
        let ratio = correct as f64 / total as f64;
        let status = if correct == total {
            GradeStatus::Correct
        } else if correct == 0 {
            GradeStatus::Incorrect
        } else {
            GradeStatus::Partial
        };
        return Some(result(index, status, round2(points * ratio), points));
    }

    let filled = values.iter().filter(|v| !v.trim().is_empty()).count();
    if filled >= question.scaffold_blank_count() {
        return Some(result(index, GradeStatus::ScaffoldComplete, points, points));
    }
    None
}

/// Questions without a usable answer key: scaffolds, final answers, or manual review.
fn grade_without_key(
    index: usize,
    question: &Question,
    answer: &AnswerEnvelope,
    options: MatchOptions<'_>,
) -> QuestionResult {
    let points = question.max_points();

    if question.has_scaffold() {
        if let Some(values) = answer.scaffold_values() {
            if let Some(graded) = grade_scaffold(index, question, values, options) {
                return graded;
            }
        }
    }

    if let (Some(expected), Some(user)) = (question.final_answer(), answer.effective_answer()) {
        return if matcher::matches(user, expected, &part_alternatives(question), options) {
            result(index, GradeStatus::Correct, points, points)
        } else {
            result(index, GradeStatus::Incorrect, 0.0, points)
        };
    }

    result(index, GradeStatus::Manual, 0.0, points)
}

fn auto_grade(question: &Question, answer: &AnswerEnvelope, options: MatchOptions<'_>) -> bool {
    let Some(user) = answer.effective_answer() else {
        return false;
    };
    let expected = question.correct_answer().unwrap_or_default();

    match question.kind() {
        QuestionType::MultipleChoice => option_key(user) == option_key(expected),
        QuestionType::MultipleSelect => {
            let wanted = if question.correct_keys.is_empty() {
                selected_keys(expected)
            } else {
                selected_keys(&question.correct_keys.join(","))
            };
            !wanted.is_empty() && selected_keys(user) == wanted
        }
        QuestionType::TrueFalse => true_false_matches(user, expected),
        _ => matcher::matches(user, expected, &part_alternatives(question), options),
    }
}

/// Grades one question.
///
/// * no answer -> `unanswered`,
/// * a pre-graded result is used verbatim,
/// * essays, matching, unknown types and questions without a key go through
///   the scaffold / final answer / manual branch,
/// * every other type is checked against its key, all or nothing.
pub fn grade_question(
    index: usize,
    question: &Question,
    answer: Option<&AnswerEnvelope>,
    pre_graded: Option<&PreGraded>,
    subject: &str,
) -> QuestionResult {
    let points = question.max_points();

    let Some(answer) = answer.filter(|a| !a.is_empty()) else {
        return result(index, GradeStatus::Unanswered, 0.0, points);
    };

    if let Some(pre) = pre_graded {
        return QuestionResult {
            index,
            status: pre.status,
            awarded: pre.result.awarded,
            max_points: pre.result.max_points,
            pre_graded: true,
        };
    }

    let options = MatchOptions::for_subject(subject);
    if !question.kind().is_auto_gradable() || !question.has_answer_key() {
        return grade_without_key(index, question, answer, options);
    }

    if auto_grade(question, answer, options) {
        result(index, GradeStatus::Correct, points, points)
    } else {
        result(index, GradeStatus::Incorrect, 0.0, points)
    }
}

/// Totals, counts per status, percentage and optional weighting.
pub fn summarize(results: &[QuestionResult], ctx: &GradingContext<'_>) -> Summary {
    let total_points = round2(results.iter().map(|r| r.max_points).sum());
    let earned_points = round2(results.iter().map(|r| r.awarded).sum());

    let count = |status: GradeStatus| results.iter().filter(|r| r.status == status).count();
    let correct_count = results
        .iter()
        .map(|r| match r.status {
            GradeStatus::Correct | GradeStatus::ScaffoldComplete => 1.0,
            GradeStatus::Partial if r.max_points > 0.0 => r.awarded / r.max_points,
            _ => 0.0,
        })
        .sum::<f64>();

    let percentage = if total_points > 0.0 {
        (earned_points / total_points * 100.0).round().clamp(0.0, 100.0) as u32
    } else {
        0
    };

    let coefficient = match (ctx.track, ctx.coefficients) {
        (Some(track), Some(source)) => match source.coefficient(track, ctx.subject) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("No coefficient for {} / {}: {}", track, ctx.subject, e);
                None
            }
        },
        _ => None,
    };

    Summary {
        total_questions: results.len(),
        total_points,
        earned_points,
        percentage,
        correct_count: round2(correct_count),
        incorrect_count: count(GradeStatus::Incorrect),
        partial_count: count(GradeStatus::Partial),
        scaffold_complete_count: count(GradeStatus::ScaffoldComplete),
        unanswered: count(GradeStatus::Unanswered),
        manual_review: count(GradeStatus::Manual),
        coefficient,
        weighted_earned: coefficient.map(|c| round2(earned_points * c)),
        weighted_total: coefficient.map(|c| round2(total_points * c)),
    }
}

/// Grades a flattened exam.
///
/// `pre_graded` must already hold every externally graded result; nothing here waits.
pub fn grade(
    questions: &[FlatQuestion],
    answers: &HashMap<usize, AnswerEnvelope>,
    pre_graded: &HashMap<usize, PreGraded>,
    ctx: &GradingContext<'_>,
) -> GradeReport {
    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|flat| {
            grade_question(
                flat.index,
                &flat.question,
                answers.get(&flat.index),
                pre_graded.get(&flat.index),
                ctx.subject,
            )
        })
        .collect();

    let summary = summarize(&results, ctx);
    tracing::debug!(
        "Graded {} questions: {}/{} points",
        summary.total_questions,
        summary.earned_points,
        summary.total_points
    );

    GradeReport {
        summary,
        results,
        graded_at: Utc::now(),
    }
}

/// Flattens then grades an exam, using its own subject.
pub fn grade_exam(
    exam: &Exam,
    answers: &HashMap<usize, AnswerEnvelope>,
    pre_graded: &HashMap<usize, PreGraded>,
    track: Option<&str>,
    coefficients: Option<&dyn CoefficientSource>,
) -> GradeReport {
    let ctx = GradingContext {
        subject: &exam.subject,
        track,
        coefficients,
    };
    grade(&flatten(exam), answers, pre_graded, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        exam::{AnswerPart, ScaffoldBlank},
        grade::PreGradedScore,
    };

    fn typed(kind: QuestionType, correct: &str, points: f64) -> Question {
        Question {
            question_type: Some(kind),
            correct: Some(correct.to_string()),
            points: Some(points),
            ..Default::default()
        }
    }

    fn part(answer: &str) -> AnswerPart {
        AnswerPart {
            label: String::new(),
            answer: answer.to_string(),
            alternatives: Vec::new(),
        }
    }

    fn plain(text: &str) -> AnswerEnvelope {
        AnswerEnvelope::plain(text)
    }

    #[test]
    fn test_multiple_choice() {
        let q = typed(QuestionType::MultipleChoice, "a", 2.0);
        let r = grade_question(0, &q, Some(&plain("a")), None, "Chimie");
        assert_eq!(r.status, GradeStatus::Correct);
        assert_eq!(r.awarded, 2.0);

        let r = grade_question(0, &q, Some(&plain("B")), None, "Chimie");
        assert_eq!(r.status, GradeStatus::Incorrect);
        assert_eq!(r.awarded, 0.0);

        assert_eq!(
            grade_question(0, &q, Some(&plain("A)")), None, "Chimie").status,
            GradeStatus::Correct
        );
    }

    #[test]
    fn test_unanswered() {
        let q = typed(QuestionType::ShortAnswer, "Dessalines", 3.0);
        let r = grade_question(4, &q, None, None, "");
        assert_eq!(r.status, GradeStatus::Unanswered);
        assert_eq!(r.max_points, 3.0);
        assert_eq!(
            grade_question(4, &q, Some(&plain("  ")), None, "").status,
            GradeStatus::Unanswered
        );
    }

    #[test]
    fn test_multiple_select_order_insensitive() {
        let mut q = typed(QuestionType::MultipleSelect, "", 1.0);
        q.correct_keys = vec!["c".to_string(), "a".to_string()];
        let r = grade_question(0, &q, Some(&plain(r#"["A","c"]"#)), None, "");
        assert_eq!(r.status, GradeStatus::Correct);
        let r = grade_question(0, &q, Some(&plain("a, b, c")), None, "");
        assert_eq!(r.status, GradeStatus::Incorrect);
    }

    #[test]
    fn test_true_false_synonyms() {
        let q = typed(QuestionType::TrueFalse, "Vrai", 1.0);
        for answer in ["true", "VRAI", "wi", "V"] {
            assert_eq!(
                grade_question(0, &q, Some(&plain(answer)), None, "").status,
                GradeStatus::Correct,
                "{}",
                answer
            );
        }
        assert_eq!(
            grade_question(0, &q, Some(&plain("faux")), None, "").status,
            GradeStatus::Incorrect
        );
    }

    #[test]
    fn test_steps_envelope_final_answer() {
        let q = typed(QuestionType::Calculation, "12", 4.0);
        let answer = AnswerEnvelope::parse(r#"{"steps":[{"math":"3*4","justification":""}],"finalAnswer":"12,0"}"#);
        let r = grade_question(0, &q, Some(&answer), None, "Mathématiques");
        assert_eq!(r.status, GradeStatus::Correct);
        assert_eq!(r.awarded, 4.0);
    }

    #[test]
    fn test_pre_graded_used_verbatim() {
        let q = Question {
            question_type: Some(QuestionType::Essay),
            points: Some(10.0),
            ..Default::default()
        };
        let pre = PreGraded {
            status: GradeStatus::Partial,
            result: PreGradedScore {
                awarded: 6.5,
                max_points: 10.0,
            },
        };
        let r = grade_question(0, &q, Some(&plain("Mon essai")), Some(&pre), "Philosophie");
        assert_eq!(r.status, GradeStatus::Partial);
        assert_eq!(r.awarded, 6.5);
        assert!(r.pre_graded);
    }

    #[test]
    fn test_essay_is_manual() {
        let q = Question {
            question_type: Some(QuestionType::Essay),
            points: Some(10.0),
            ..Default::default()
        };
        let r = grade_question(0, &q, Some(&plain("Mon essai")), None, "Philosophie");
        assert_eq!(r.status, GradeStatus::Manual);
        assert_eq!(r.awarded, 0.0);
    }

    #[test]
    fn test_final_answer_without_correct() {
        let q = Question {
            question_type: Some(QuestionType::ShortAnswer),
            final_answer: Some("1804".to_string()),
            answer_parts: vec![AnswerPart {
                label: "a".to_string(),
                answer: "1er janvier 1804".to_string(),
                alternatives: vec!["janvier 1804".to_string()],
            }],
            points: Some(2.0),
            ..Default::default()
        };
        let r = grade_question(0, &q, Some(&plain("janvier 1804")), None, "Histoire");
        assert_eq!(r.status, GradeStatus::Correct);
        let r = grade_question(0, &q, Some(&plain("1750")), None, "Histoire");
        assert_eq!(r.status, GradeStatus::Incorrect);
    }

    #[test]
    fn test_scaffold_partial_credit() {
        let q = Question {
            question_type: Some(QuestionType::Calculation),
            points: Some(4.0),
            scaffold_text: Some("x = ____ ; y = ____ ; z = ____ ; t = ____".to_string()),
            answer_parts: vec![part("1"), part("2"), part("3"), part("4")],
            ..Default::default()
        };
        let answer = AnswerEnvelope::Scaffold {
            values: vec!["1".into(), "2".into(), "3".into(), "5".into()],
        };
        let r = grade_question(0, &q, Some(&answer), None, "Mathématiques");
        assert_eq!(r.status, GradeStatus::Partial);
        assert_eq!(r.awarded, 3.0);
    }

    #[test]
    fn test_scaffold_complete_without_parts() {
        let q = Question {
            question_type: Some(QuestionType::Essay),
            points: Some(2.0),
            scaffold_blanks: vec![ScaffoldBlank::default(), ScaffoldBlank::default()],
            ..Default::default()
        };
        let full = AnswerEnvelope::Scaffold {
            values: vec!["thèse".into(), "antithèse".into()],
        };
        let r = grade_question(0, &q, Some(&full), None, "Philosophie");
        assert_eq!(r.status, GradeStatus::ScaffoldComplete);
        assert_eq!(r.awarded, 2.0);

        let half = AnswerEnvelope::Scaffold {
            values: vec!["thèse".into(), "".into()],
        };
        let r = grade_question(0, &q, Some(&half), None, "Philosophie");
        assert_eq!(r.status, GradeStatus::Manual);
    }

    #[test]
    fn test_summary_zero_total() {
        let results = vec![result(0, GradeStatus::Correct, 0.0, 0.0)];
        let summary = summarize(&results, &GradingContext::default());
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.total_points, 0.0);
    }

    #[test]
    fn test_summary_counts_partial_fractionally() {
        let results = vec![
            result(0, GradeStatus::Correct, 2.0, 2.0),
            result(1, GradeStatus::Partial, 3.0, 4.0),
            result(2, GradeStatus::Incorrect, 0.0, 1.0),
            result(3, GradeStatus::Unanswered, 0.0, 1.0),
            result(4, GradeStatus::Manual, 0.0, 2.0),
        ];
        let summary = summarize(&results, &GradingContext::default());
        assert_eq!(summary.correct_count, 1.75);
        assert_eq!(summary.partial_count, 1);
        assert_eq!(summary.earned_points, 5.0);
        assert_eq!(summary.total_points, 10.0);
        assert_eq!(summary.percentage, 50);
        let accounted = summary.correct_count
            + (summary.incorrect_count + summary.unanswered + summary.manual_review) as f64;
        assert!(summary.total_questions as f64 - accounted <= summary.partial_count as f64);
        assert_eq!(summary.weighted_total, None);
    }

    struct FixedCoefficient(f64);

    impl CoefficientSource for FixedCoefficient {
        fn coefficient(
            &self,
            _track: &str,
            _subject: &str,
        ) -> Result<f64, crate::error::CoefficientError> {
            Ok(self.0)
        }
    }

    struct Failing;

    impl CoefficientSource for Failing {
        fn coefficient(
            &self,
            _track: &str,
            _subject: &str,
        ) -> Result<f64, crate::error::CoefficientError> {
            Err(crate::error::CoefficientError::MissingSubject)
        }
    }

    #[test]
    fn test_weighted_totals() {
        let results = vec![result(0, GradeStatus::Correct, 7.0, 10.0)];
        let source = FixedCoefficient(3.0);
        let ctx = GradingContext {
            subject: "Chimie",
            track: Some("SVT"),
            coefficients: Some(&source),
        };
        let summary = summarize(&results, &ctx);
        assert_eq!(summary.coefficient, Some(3.0));
        assert_eq!(summary.weighted_earned, Some(21.0));
        assert_eq!(summary.weighted_total, Some(30.0));
    }

    #[test]
    fn test_coefficient_failure_is_swallowed() {
        let results = vec![result(0, GradeStatus::Correct, 7.0, 10.0)];
        let ctx = GradingContext {
            subject: "",
            track: Some("SVT"),
            coefficients: Some(&Failing),
        };
        let summary = summarize(&results, &ctx);
        assert_eq!(summary.percentage, 70);
        assert_eq!(summary.weighted_earned, None);
    }
}
