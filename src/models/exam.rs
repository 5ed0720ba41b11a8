// src/models/exam.rs

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Blank placeholders inside scaffold or question text: 4+ underscores or dots.
static BLANK_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{4,}|\.{4,}|…{2,}").expect("valid blank regex"));

/// One exam document from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    #[serde(default, deserialize_with = "label")]
    pub exam_id: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub subject: String,

    #[serde(default, deserialize_with = "text")]
    pub level: String,

    /// Raw year: "2019", "2016-2022", "Juin 2019"...
    #[serde(default, deserialize_with = "text")]
    pub year: String,

    #[serde(default, deserialize_with = "text")]
    pub exam_title: String,

    #[serde(default)]
    pub duration_minutes: Option<f64>,

    #[serde(default)]
    pub total_points: Option<f64>,

    #[serde(default, deserialize_with = "nullable")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "text")]
    pub section_title: String,

    /// Free text mixing pedagogical content and administrative consignes.
    #[serde(default, deserialize_with = "text")]
    pub instructions: String,

    #[serde(default, deserialize_with = "nullable")]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MultipleSelect,
    TrueFalse,
    FillBlank,
    Calculation,
    ShortAnswer,
    Essay,
    Matching,
    #[serde(other)]
    Unknown,
}

impl QuestionType {
    /// Types whose answer key can be checked without a human reviewer.
    pub fn is_auto_gradable(self) -> bool {
        !matches!(
            self,
            QuestionType::Essay | QuestionType::Matching | QuestionType::Unknown
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerPart {
    #[serde(default, deserialize_with = "text")]
    pub label: String,

    #[serde(default, deserialize_with = "text")]
    pub answer: String,

    #[serde(default, deserialize_with = "nullable")]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaffoldBlank {
    #[serde(default, deserialize_with = "text")]
    pub label: String,

    #[serde(default)]
    pub hint: Option<String>,
}

/// Represents a single exam question as stored in the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    /// Display label such as "A.1" or "5".
    #[serde(default, deserialize_with = "label")]
    pub number: Option<String>,

    /// Mapped from the JSON field 'type' since `type` is a reserved keyword in Rust.
    #[serde(rename = "type", default)]
    pub question_type: Option<QuestionType>,

    #[serde(default, deserialize_with = "text")]
    pub question: String,

    /// Choice key -> choice text.
    #[serde(default, deserialize_with = "nullable")]
    pub options: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "label")]
    pub correct: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub correct_keys: Vec<String>,

    #[serde(default)]
    pub points: Option<f64>,

    #[serde(default, deserialize_with = "nullable")]
    pub answer_parts: Vec<AnswerPart>,

    #[serde(default, deserialize_with = "label")]
    pub final_answer: Option<String>,

    #[serde(default, deserialize_with = "label")]
    pub scaffold_text: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub scaffold_blanks: Vec<ScaffoldBlank>,

    #[serde(default, deserialize_with = "nullable")]
    pub has_figure: bool,

    #[serde(default, deserialize_with = "label")]
    pub figure_description: Option<String>,
}

impl Question {
    pub fn kind(&self) -> QuestionType {
        self.question_type.unwrap_or(QuestionType::Unknown)
    }

    /// Question weight; missing or nonsensical weights count as 1.
    pub fn max_points(&self) -> f64 {
        match self.points {
            Some(p) if p.is_finite() && p >= 0.0 => p,
            _ => 1.0,
        }
    }

    /// The `correct` field, if it holds anything.
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    /// Whether the engine holds an answer key for this question's type.
    pub fn has_answer_key(&self) -> bool {
        match self.kind() {
            QuestionType::MultipleSelect => {
                !self.correct_keys.is_empty() || self.correct_answer().is_some()
            }
            _ => self.correct_answer().is_some(),
        }
    }

    /// Number of blanks the scaffold offers to fill.
    pub fn scaffold_blank_count(&self) -> usize {
        if !self.scaffold_blanks.is_empty() {
            return self.scaffold_blanks.len();
        }
        self.scaffold_text
            .as_deref()
            .map(|t| BLANK_PLACEHOLDER.find_iter(t).count())
            .unwrap_or(0)
    }

    pub fn has_scaffold(&self) -> bool {
        self.scaffold_blank_count() > 0
    }
}

/// `null` in the catalog means "empty" for collections.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Labels are written as strings, numbers or booleans depending on who typed the exam.
fn label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(label(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tolerant_question_deserialization() {
        let q: Question = serde_json::from_value(json!({
            "number": 5,
            "type": "true_false",
            "question": "La Terre est ronde.",
            "options": null,
            "correct": true,
            "answer_parts": null,
            "has_figure": null
        }))
        .unwrap();

        assert_eq!(q.number.as_deref(), Some("5"));
        assert_eq!(q.kind(), QuestionType::TrueFalse);
        assert_eq!(q.correct_answer(), Some("true"));
        assert!(q.options.is_empty());
        assert!(!q.has_figure);
        assert_eq!(q.max_points(), 1.0);
    }

    #[test]
    fn test_unknown_type_and_missing_type() {
        let q: Question = serde_json::from_value(json!({ "type": "drawing" })).unwrap();
        assert_eq!(q.question_type, Some(QuestionType::Unknown));

        let q: Question = serde_json::from_value(json!({ "question": "?" })).unwrap();
        assert_eq!(q.question_type, None);
        assert_eq!(q.kind(), QuestionType::Unknown);
    }

    #[test]
    fn test_scaffold_blank_count_from_text() {
        let q = Question {
            scaffold_text: Some("v = ____ m/s et t = ..... s".to_string()),
            ..Default::default()
        };
        assert_eq!(q.scaffold_blank_count(), 2);
        assert!(q.has_scaffold());
    }

    #[test]
    fn test_multiple_select_answer_key() {
        let q = Question {
            question_type: Some(QuestionType::MultipleSelect),
            correct_keys: vec!["a".into(), "c".into()],
            ..Default::default()
        };
        assert!(q.has_answer_key());
    }
}
