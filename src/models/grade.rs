// src/models/grade.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// Terminal grading state of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradeStatus {
    Unanswered,
    Correct,
    Incorrect,
    Partial,
    Manual,
    ScaffoldComplete,
}

/// Per-question outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub index: usize,
    pub status: GradeStatus,
    pub awarded: f64,
    pub max_points: f64,
    /// Set when the result was injected by an external grader.
    pub pre_graded: bool,
}

/// Score block of an externally graded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreGradedScore {
    pub awarded: f64,
    pub max_points: f64,
}

/// Result supplied by an asynchronous grader (AI essay review...), used verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreGraded {
    pub status: GradeStatus,
    pub result: PreGradedScore,
}

/// Aggregate of a grading pass.
///
/// `correct_count` counts partial answers fractionally (awarded / max), so
/// `correct_count + incorrect_count + unanswered + manual_review` falls short of
/// `total_questions` by the sum of the missing fractions of partial answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_questions: usize,
    pub total_points: f64,
    pub earned_points: f64,
    pub percentage: u32,
    pub correct_count: f64,
    pub incorrect_count: usize,
    pub partial_count: usize,
    pub scaffold_complete_count: usize,
    pub unanswered: usize,
    pub manual_review: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_earned: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_total: Option<f64>,
}

/// What the result consumer receives.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub summary: Summary,
    pub results: Vec<QuestionResult>,
    pub graded_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    /// User's answers map.
    /// Key: question index in the flattened exam
    /// Value: answer text or an answer envelope object
    #[serde(default)]
    pub answers: HashMap<usize, Value>,

    #[serde(default)]
    #[validate(custom(function = validate_pre_graded))]
    pub pre_graded: HashMap<usize, PreGraded>,

    /// Bac track (SVT, SMP, SES, LLA) for coefficient weighting.
    #[validate(length(min = 1, max = 20))]
    pub track: Option<String>,
}

fn validate_pre_graded(pre_graded: &HashMap<usize, PreGraded>) -> Result<(), ValidationError> {
    for entry in pre_graded.values() {
        let PreGradedScore {
            awarded,
            max_points,
        } = entry.result;
        if !awarded.is_finite() || !max_points.is_finite() {
            return Err(ValidationError::new("pre_graded_score_not_finite"));
        }
        if awarded < 0.0 || max_points < 0.0 || awarded > max_points {
            return Err(ValidationError::new("pre_graded_score_out_of_range"));
        }
    }
    Ok(())
}
