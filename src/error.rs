use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::quotes::QuoteError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown symbol")]
    UnknownSymbol,

    #[error("No holding in that symbol")]
    NoSuchHolding,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Insufficient shares")]
    InsufficientShares,

    #[error("Quote lookup failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            AppError::UsernameTaken => (StatusCode::CONFLICT, "Username already taken".to_string()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UnknownSymbol => (StatusCode::BAD_REQUEST, "Unknown symbol".to_string()),
            AppError::NoSuchHolding => (StatusCode::BAD_REQUEST, "No holding in that symbol".to_string()),
            AppError::InsufficientFunds => (StatusCode::BAD_REQUEST, "Insufficient funds".to_string()),
            AppError::InsufficientShares => (StatusCode::BAD_REQUEST, "Insufficient shares".to_string()),
            AppError::Quote(_) => (StatusCode::BAD_GATEWAY, "Quote service unavailable".to_string()),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
