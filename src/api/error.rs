use crate::models::ErrorResponse;
use crate::services::completion::CompletionError;
use crate::services::ocr::ExtractionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned for every failure after the upload has been accepted
pub const GENERIC_FAILURE: &str = "Failed to process request";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No image file provided")]
    MissingUpload,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    #[error("Completion failed: {0}")]
    CompletionFailed(#[from] CompletionError),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingUpload => (
                StatusCode::BAD_REQUEST,
                "No image file provided".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::ExtractionFailed(e) => {
                tracing::error!("Text extraction failed: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_FAILURE.to_string(),
                )
            }
            AppError::CompletionFailed(e) => {
                tracing::error!("Completion failed: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_FAILURE.to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_FAILURE.to_string(),
                )
            }
        };

        let body = Json(ErrorResponse { error: message });

        (status, body).into_response()
    }
}
