//! Custom error types for the scheduling service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::permissions::PermissionError;

/// Custom error type for the scheduling service HTTP surface
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Grant rejected because the grantee's role is not eligible
    #[error("Ineligible: {0}")]
    Ineligible(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::UserNotFound(_)
            | PermissionError::ShiftNotFound(_)
            | PermissionError::JobNotFound(_) => ApiError::NotFound(err.to_string()),
            PermissionError::IneligibleRole { .. } => ApiError::Ineligible(err.to_string()),
            PermissionError::Store(e) => {
                tracing::error!("Permission storage failure: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Ineligible(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
