use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-boundary error. Every variant carries a stable machine-readable
/// action code alongside the human-readable message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {1}")]
    Forbidden(&'static str, String),

    #[error("Not Found: {1}")]
    NotFound(&'static str, String),

    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Conflict: {1}")]
    Conflict(&'static str, String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {1}")]
    ExternalService(&'static str, String),
}

impl AppError {
    pub fn action(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthenticated",
            AppError::Forbidden(action, _)
            | AppError::NotFound(action, _)
            | AppError::ValidationError(action, _)
            | AppError::Conflict(action, _)
            | AppError::ExternalService(action, _) => action,
            AppError::Internal(_) => "internal-error",
            AppError::Database(_) => "storage-error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(..) => StatusCode::BAD_REQUEST,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(..) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message safe to show a client. Internal and storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) | AppError::Database(_) => "Internal server error".to_string(),
            AppError::Auth(msg) => msg.clone(),
            AppError::Forbidden(_, msg)
            | AppError::NotFound(_, msg)
            | AppError::ValidationError(_, msg)
            | AppError::Conflict(_, msg)
            | AppError::ExternalService(_, msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::warn!("Request rejected: {} [{}]: {}", status, self.action(), self);
        }

        let body = Json(json!({
            "success": false,
            "action": self.action(),
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}
