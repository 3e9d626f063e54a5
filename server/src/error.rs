//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quire_engine::Error as EngineError;
use serde::Serialize;

/// Message returned when a batch hits an operation that cannot be applied.
pub const CORRUPTED_MESSAGE: &str =
    "One of the received operations is corrupted, can't apply this and all following operations.";

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, Option<String>) {
        match self {
            AppError::Engine(EngineError::DocumentNotFound(id)) => {
                tracing::error!(document_id = %id, "Update for unknown document");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Document with id {} not found", id),
                    None,
                )
            }
            AppError::Engine(e @ EngineError::CorruptedOperation { committed, .. }) => {
                tracing::warn!(committed = *committed, "Corrupted operation: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    CORRUPTED_MESSAGE.to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Engine(e @ EngineError::InconsistentRecord(_)) => {
                tracing::error!("Inconsistent document record: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
        }
    }

    /// Message for clients that cannot read a status code.
    pub fn message(&self) -> String {
        match self.parts() {
            (_, error, Some(details)) => format!("{}: {}", error, details),
            (_, error, None) => error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = self.parts();

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
