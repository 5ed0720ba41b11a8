// src/models/catalog.rs

use std::{fs, path::Path};

use serde::Serialize;

use crate::{
    engine::{
        normalize::{level_from_title, normalize_level, normalize_subject, normalize_title, parse_year},
        repair::repair_catalog,
    },
    error::AppError,
    models::exam::Exam,
};

/// The exam catalog, repaired once at load time and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exams: Vec<Exam>,
}

impl Catalog {
    pub fn from_exams(mut exams: Vec<Exam>) -> Self {
        repair_catalog(&mut exams);
        Self { exams }
    }

    /// Loads a JSON array of exams.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read catalog {}: {:?}", path.display(), e);
            AppError::from(e)
        })?;
        let exams: Vec<Exam> = serde_json::from_str(&raw)?;
        tracing::info!("Loaded {} exams from {}", exams.len(), path.display());
        Ok(Self::from_exams(exams))
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }

    /// Looks an exam up by its opaque `exam_id`, then by catalog index.
    pub fn find(&self, id: &str) -> Option<(usize, &Exam)> {
        let id = id.trim();
        self.exams
            .iter()
            .position(|e| e.exam_id.as_deref() == Some(id))
            .or_else(|| id.parse::<usize>().ok().filter(|i| *i < self.exams.len()))
            .map(|i| (i, &self.exams[i]))
    }
}

/// Catalog entry with normalised metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: usize,
    pub exam_id: Option<String>,
    pub subject: String,
    pub level: String,
    pub year: u32,
    pub session: String,
    pub title: String,
    pub duration_minutes: Option<f64>,
    pub total_points: Option<f64>,
    pub question_count: usize,
}

impl ExamSummary {
    pub fn new(id: usize, exam: &Exam) -> Self {
        let year = parse_year(&exam.year);
        let level = if exam.level.trim().is_empty() {
            level_from_title(&exam.exam_title).to_string()
        } else {
            normalize_level(&exam.level)
        };

        Self {
            id,
            exam_id: exam.exam_id.clone(),
            subject: normalize_subject(&exam.subject),
            level,
            year: year.year,
            session: year.session,
            title: normalize_title(&exam.exam_title, &exam.subject, &exam.year),
            duration_minutes: exam.duration_minutes,
            total_points: exam.total_points,
            question_count: exam.sections.iter().map(|s| s.questions.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        let exams: Vec<Exam> = serde_json::from_value(json!([
            {
                "exam_id": "chimie-2019",
                "subject": "CHIMIE",
                "level": "NS4",
                "year": "Juin 2019",
                "exam_title": "Baccalauréat — Chimie — CHIMIE ORGANIQUE",
                "sections": [{ "section_title": "I", "questions": [
                    { "number": 1, "question": "Nommez CH4", "options": null },
                    { "number": "2", "type": "multiple_choice", "question": "?",
                      "options": { "a": "méthane", "b": "éthane" }, "final_answer": "a" }
                ]}]
            },
            { "subject": "Philo", "year": "2018", "exam_title": "Bac Philo 2018", "sections": null }
        ]))
        .unwrap();
        Catalog::from_exams(exams)
    }

    #[test]
    fn test_find_by_id_or_index() {
        let c = catalog();
        assert_eq!(c.find("chimie-2019").map(|(i, _)| i), Some(0));
        assert_eq!(c.find("1").map(|(i, _)| i), Some(1));
        assert!(c.find("2").is_none());
        assert!(c.find("nope").is_none());
    }

    #[test]
    fn test_repair_applied_on_load() {
        let c = catalog();
        let questions = &c.exams()[0].sections[0].questions;
        assert_eq!(questions[1].correct.as_deref(), Some("a"));
        assert!(questions[0].question_type.is_some());
    }

    #[test]
    fn test_summary() {
        let c = catalog();
        let s = ExamSummary::new(0, &c.exams()[0]);
        assert_eq!(s.subject, "Chimie");
        assert_eq!(s.level, "Terminale");
        assert_eq!(s.year, 2019);
        assert_eq!(s.session, "Juin 2019");
        assert_eq!(s.title, "Chimie — Organique · Juin 2019");
        assert_eq!(s.question_count, 2);

        let s = ExamSummary::new(1, &c.exams()[1]);
        assert_eq!(s.level, "Terminale");
        assert_eq!(s.title, "Philosophie · 2018");
        assert_eq!(s.question_count, 0);
    }
}
