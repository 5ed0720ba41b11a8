// src/models/answer.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

/// One written step of a multi-step answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub math: String,
    #[serde(default)]
    pub justification: String,
}

/// A user's answer, parsed once when it enters the engine.
///
/// The answer store holds a single string per question: plain text,
/// a JSON multi-step envelope `{steps, finalAnswer}` or a JSON scaffold
/// envelope `{scaffold: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerEnvelope {
    Plain { text: String },
    Steps { steps: Vec<Step>, final_answer: String },
    Scaffold { values: Vec<String> },
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    steps: Option<Vec<Step>>,
    #[serde(default, rename = "finalAnswer", alias = "final_answer")]
    final_answer: Option<Value>,
    #[serde(default)]
    scaffold: Option<Vec<Value>>,
}

impl AnswerEnvelope {
    pub fn plain(text: impl Into<String>) -> Self {
        AnswerEnvelope::Plain { text: text.into() }
    }

    /// Parses raw answer text; anything that is not a well-formed envelope is plain text.
    pub fn parse(raw: &str) -> Self {
        match Self::try_parse(raw) {
            Ok(envelope) => envelope,
            Err(ParseError::NotAnEnvelope) => Self::plain(raw),
            Err(e) => {
                tracing::debug!("Answer looks like JSON but is not an envelope: {}", e);
                Self::plain(raw)
            }
        }
    }

    /// Strict envelope parser.
    pub fn try_parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return Err(ParseError::NotAnEnvelope);
        }
        let value: Value = serde_json::from_str(trimmed)?;
        Self::try_from_value(&value)
    }

    /// Accepts an already-decoded JSON value (string, object, number...).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Null => Self::plain(""),
            Value::Object(_) => Self::try_from_value(value).unwrap_or_else(|e| {
                tracing::debug!("Unrecognised answer object, keeping it as text: {}", e);
                Self::plain(value.to_string())
            }),
            other => Self::plain(other.to_string()),
        }
    }

    fn try_from_value(value: &Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError::NotAnEnvelope);
        }
        let raw: RawEnvelope = serde_json::from_value(value.clone())?;

        if let Some(blanks) = raw.scaffold {
            let values = blanks.iter().map(value_text).collect();
            return Ok(AnswerEnvelope::Scaffold { values });
        }

        if raw.steps.is_some() || raw.final_answer.is_some() {
            return Ok(AnswerEnvelope::Steps {
                steps: raw.steps.unwrap_or_default(),
                final_answer: raw.final_answer.as_ref().map(value_text).unwrap_or_default(),
            });
        }

        Err(ParseError::NotAnEnvelope)
    }

    /// The single answer string to compare with an answer key, if any.
    pub fn effective_answer(&self) -> Option<&str> {
        let text = match self {
            AnswerEnvelope::Plain { text } => text.as_str(),
            AnswerEnvelope::Steps { final_answer, .. } => final_answer.as_str(),
            AnswerEnvelope::Scaffold { .. } => return None,
        };
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn scaffold_values(&self) -> Option<&[String]> {
        match self {
            AnswerEnvelope::Scaffold { values } => Some(values),
            _ => None,
        }
    }

    /// True when the user has written nothing at all.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerEnvelope::Plain { text } => text.trim().is_empty(),
            AnswerEnvelope::Steps {
                steps,
                final_answer,
            } => {
                final_answer.trim().is_empty()
                    && steps
                        .iter()
                        .all(|s| s.math.trim().is_empty() && s.justification.trim().is_empty())
            }
            AnswerEnvelope::Scaffold { values } => values.iter().all(|v| v.trim().is_empty()),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
