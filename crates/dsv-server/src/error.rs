//! Server-wide error type for requests outside the feature slices

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("DSV error: {0}")]
    Dsv(#[from] dsv_common::DsvError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DATABASE_UNAVAILABLE",
                    "The database is unavailable".to_string(),
                )
            },
            AppError::NotFound(ref message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone()),
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            },
            AppError::Dsv(ref e) => {
                tracing::error!("DSV error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string())
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
