//! Error types for the Image Tools server
//!
//! Client errors carry their reason in a plain-text body. Server-side
//! failures are logged in full and answered with a generic message.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::transform::{Operation, TransformError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{operation} failed: {source}")]
    Transform {
        operation: Operation,
        #[source]
        source: TransformError,
    },

    #[error("{operation} failed to store output: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: ArtifactError,
    },

    #[error("Download failed: {0}")]
    Download(#[from] ArtifactError),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn transform(operation: Operation, source: TransformError) -> Self {
        AppError::Transform { operation, source }
    }

    pub fn store(operation: Operation, source: ArtifactError) -> Self {
        AppError::Store { operation, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Multipart(e) => {
                tracing::debug!(error = %e, "Rejected multipart body");
                (e.status(), e.body_text())
            }
            AppError::Transform { operation, source } => {
                tracing::error!(operation = %operation, error = %source, "Transform failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    operation.failure_message().to_string(),
                )
            }
            AppError::Store { operation, source } => {
                tracing::error!(operation = %operation, error = %source, "Failed to store artifact");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    operation.failure_message().to_string(),
                )
            }
            AppError::Download(e) => match e.status_code() {
                StatusCode::NOT_FOUND => {
                    tracing::debug!(error = %e, "Download of unknown artifact");
                    (StatusCode::NOT_FOUND, "File not found".to_string())
                }
                status => {
                    tracing::error!(error = %e, "Download error");
                    (status, "Could not download file.".to_string())
                }
            },
        };

        (status, message).into_response()
    }
}
