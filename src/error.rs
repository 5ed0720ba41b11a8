// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling at the service boundary and maps it to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Catalog and coefficient files are read at startup; a missing file is fatal there.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Failure of one of the engine's parsers.
///
/// These never cross the engine's public grading/matching entry points:
/// callers match on them and fall back to a conservative result.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input was empty after trimming.
    Empty,

    /// A character outside the arithmetic whitelist survived translation.
    DisallowedCharacter(char),

    /// A `Math.` identifier the evaluator does not know.
    UnknownFunction(String),

    UnexpectedToken(String),
    UnexpectedEnd,

    /// The expression evaluated to NaN or an infinity.
    NonFinite,

    /// Answer text is not a JSON envelope (plain text).
    NotAnEnvelope,

    InvalidJson(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty input"),
            ParseError::DisallowedCharacter(c) => write!(f, "disallowed character {:?}", c),
            ParseError::UnknownFunction(name) => write!(f, "unknown function {}", name),
            ParseError::UnexpectedToken(tok) => write!(f, "unexpected token {}", tok),
            ParseError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ParseError::NonFinite => write!(f, "expression is not a finite number"),
            ParseError::NotAnEnvelope => write!(f, "not a JSON answer envelope"),
            ParseError::InvalidJson(msg) => write!(f, "invalid JSON: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::InvalidJson(err.to_string())
    }
}

/// Coefficient lookup failure. The grading engine swallows it and omits weighted totals.
#[derive(Debug, Clone, PartialEq)]
pub enum CoefficientError {
    MissingTrack,
    MissingSubject,
    InvalidValue { track: String, subject: String, value: f64 },
}

impl fmt::Display for CoefficientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoefficientError::MissingTrack => write!(f, "no track supplied"),
            CoefficientError::MissingSubject => write!(f, "no subject supplied"),
            CoefficientError::InvalidValue {
                track,
                subject,
                value,
            } => write!(
                f,
                "invalid coefficient {} for track {} / subject {}",
                value, track, subject
            ),
        }
    }
}

impl std::error::Error for CoefficientError {}
