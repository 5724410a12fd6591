use crate::utils::error::ConceptsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database connection failed")]
    DatabaseUnavailable,

    #[error("Internal error: {0}")]
    Internal(#[from] ConceptsError),
}

/// Error body, `{"detail": "..."}`.
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::DatabaseUnavailable => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::Internal(e) => {
                tracing::error!(
                    category = ?e.category(),
                    "Request failed: {}",
                    e
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
