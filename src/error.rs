//! Error types for the Filechest server

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file uploaded.")]
    NoFile,

    #[error("Banned.")]
    Banned { reason: String },

    #[error("File exceeds 5 GB limit.")]
    TooLarge,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            reason: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NoFile => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("No file uploaded."),
            ),
            AppError::Banned { reason } => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "Banned.".to_string(),
                    reason: Some(reason.clone()),
                },
            ),
            AppError::TooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorResponse::new("File exceeds 5 GB limit."),
            ),
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new(format!("Not found: {}", what)))
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            AppError::RangeNotSatisfiable { size } => {
                // 416 carries the unsatisfied-range form of Content-Range
                return (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                    Json(ErrorResponse::new("Range not satisfiable.")),
                )
                    .into_response();
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Storage error."),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Database error."),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("An internal error occurred."),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
