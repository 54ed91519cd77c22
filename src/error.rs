use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::{crud::RepositoryError, StoreError};
use crate::services::{auth_token::AuthTokenError, validators::ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    Payload(#[from] JsonRejection),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthTokenError> for AppError {
    fn from(e: AuthTokenError) -> Self {
        match e {
            AuthTokenError::Encoding(_) | AuthTokenError::UnsupportedAlgorithm(_) => {
                AppError::Internal(anyhow::Error::new(e))
            }
            _ => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_debug = format!("{:?}", self);

        let (status, error_message) = match self {
            AppError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            AppError::Payload(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.body_text()),
            AppError::Repository(e) => match e {
                RepositoryError::Invalid(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
                RepositoryError::Create { .. } => {
                    (StatusCode::CONFLICT, "this card number already exists".to_string())
                }
                RepositoryError::Select { .. }
                | RepositoryError::Update { .. }
                | RepositoryError::Delete { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                RepositoryError::Store(StoreError::UniqueViolation(_)) => {
                    (StatusCode::CONFLICT, "Unique constraint violated".to_string())
                }
                RepositoryError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                ),
            },
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_debug, "Request failed");
        }

        let body = Json(json!({
            "error": error_debug,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
