//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::domain::DomainError;
use crate::store::RepositoryError;
use crate::validation::ValidationErrors;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("The given data was invalid")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Wallet not found")]
    WalletNotFound(String),

    #[error("Source wallet not found")]
    SourceWalletNotFound(String),

    #[error("Destination wallet not found")]
    DestinationWalletNotFound(String),

    #[error("User not found")]
    UserNotFound(i64),

    #[error("User already has a wallet")]
    WalletAlreadyExists(i64),

    #[error("{0} not found")]
    ResourceNotFound(&'static str),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Persistence error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn text(value: impl ToString) -> Option<serde_json::Value> {
    Some(serde_json::Value::String(value.to_string()))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", text(msg))
            }

            // 401 Unauthorized
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
            }

            // 422 Unprocessable Entity
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                serde_json::to_value(errors).ok(),
            ),
            AppError::WalletNotFound(id) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "wallet_not_found", text(id))
            }
            AppError::SourceWalletNotFound(id) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "source_wallet_not_found", text(id))
            }
            AppError::DestinationWalletNotFound(id) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "destination_wallet_not_found", text(id))
            }
            AppError::UserNotFound(id) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "user_not_found", text(id))
            }
            AppError::WalletAlreadyExists(user_id) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "wallet_already_exists", text(user_id))
            }

            // 404 Not Found
            AppError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),

            // Domain errors - malformed input is 400, business outcomes 422
            AppError::Domain(domain_err) => {
                let status = if domain_err.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                let (error_code, details) = match domain_err {
                    DomainError::InvalidAmount(msg) => ("invalid_amount", text(msg)),
                    DomainError::InvalidTransaction(msg) => ("invalid_transaction", text(msg)),
                    DomainError::InvalidTransactionState(msg) => {
                        ("invalid_transaction_state", text(msg))
                    }
                    DomainError::InsufficientFunds {
                        required,
                        available,
                    } => (
                        "insufficient_funds",
                        Some(serde_json::json!({
                            "required": required.format(),
                            "available": available.format(),
                        })),
                    ),
                };
                (status, error_code, details)
            }

            // 500 Internal Server Error
            AppError::Repository(e) => {
                tracing::error!("Persistence error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", None)
            }
            AppError::Auth(e) => {
                tracing::error!("Credential error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "auth_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        // server-side detail stays in the logs
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
