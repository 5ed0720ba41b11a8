// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{
        consigne::parse_consignes,
        flatten::{PublicQuestion, flatten},
        normalize::{normalize_level, normalize_subject},
    },
    error::AppError,
    models::catalog::{Catalog, ExamSummary},
};

/// Query parameters for listing exams.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub subject: Option<String>,
    pub level: Option<String>,
}

/// Section header as shown above its questions.
#[derive(Debug, Serialize)]
pub struct SectionView {
    pub title: String,
    /// Administrative consignes split out of the instructions.
    pub rules: Vec<String>,
    pub instructions: String,
}

#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub sections: Vec<SectionView>,
    pub questions: Vec<PublicQuestion>,
}

/// Lists catalog entries, optionally filtered by subject and level.
///
/// Filters are normalised the same way as the catalog, so `?subject=maths`
/// finds "Mathématiques".
pub async fn list_exams(
    State(catalog): State<Arc<Catalog>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let subject = params.subject.as_deref().map(normalize_subject);
    let level = params.level.as_deref().map(normalize_level);

    let exams: Vec<ExamSummary> = catalog
        .exams()
        .iter()
        .enumerate()
        .map(|(id, exam)| ExamSummary::new(id, exam))
        .filter(|s| subject.as_ref().is_none_or(|wanted| &s.subject == wanted))
        .filter(|s| level.as_ref().is_none_or(|wanted| &s.level == wanted))
        .collect();

    Ok(Json(exams))
}

/// Retrieves one exam for display: sections with their consignes and questions without answer keys.
pub async fn get_exam(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (index, exam) = catalog
        .find(&id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let sections = exam
        .sections
        .iter()
        .map(|section| {
            let split = parse_consignes(&section.instructions);
            SectionView {
                title: section.section_title.clone(),
                rules: split.rules,
                instructions: split.cleaned_text,
            }
        })
        .collect();

    let questions = flatten(exam).iter().map(PublicQuestion::from).collect();

    Ok(Json(ExamDetail {
        summary: ExamSummary::new(index, exam),
        sections,
        questions,
    }))
}
