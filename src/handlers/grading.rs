// src/handlers/grading.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    coefficients::CoefficientTable,
    engine::{
        flatten::flatten,
        grading::{GradingContext, grade},
    },
    error::AppError,
    models::{answer::AnswerEnvelope, catalog::Catalog, grade::GradeRequest},
};

/// Grades one attempt at an exam.
///
/// * Validates the payload (track length, pre-graded score ranges).
/// * Rejects answers or pre-graded results for questions the exam does not have.
/// * Parses every raw answer into an envelope once, then runs the grading engine.
pub async fn grade_attempt(
    State(catalog): State<Arc<Catalog>>,
    State(coefficients): State<Arc<CoefficientTable>>,
    Path(id): Path<String>,
    Json(req): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (index, exam) = catalog
        .find(&id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = flatten(exam);
    if let Some(bad) = req
        .answers
        .keys()
        .chain(req.pre_graded.keys())
        .find(|i| **i >= questions.len())
    {
        return Err(AppError::BadRequest(format!(
            "Question {} does not exist (exam has {} questions)",
            bad,
            questions.len()
        )));
    }

    let answers: HashMap<usize, AnswerEnvelope> = req
        .answers
        .iter()
        .map(|(i, raw)| (*i, AnswerEnvelope::from_value(raw)))
        .collect();

    let ctx = GradingContext {
        subject: &exam.subject,
        track: req.track.as_deref(),
        coefficients: Some(coefficients.as_ref()),
    };
    let report = grade(&questions, &answers, &req.pre_graded, &ctx);

    tracing::info!(
        "Graded exam {}: {}/{} points ({}%)",
        index,
        report.summary.earned_points,
        report.summary.total_points,
        report.summary.percentage
    );

    Ok(Json(report))
}
