use crate::auth::AuthRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{}", .0.message())]
    Unauthorized(AuthRejection),

    #[error("Invalid request: {message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(#[from] semantic::SemanticError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// `missing` or `invalid` for authentication failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServerError::InvalidRequest { status, .. } => *status,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Embedding(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::Unauthorized(_) => "FORBIDDEN",
            ServerError::InvalidRequest { .. } => "INVALID_REQUEST",
            ServerError::Embedding(_) => "EMBEDDING_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let reason = match &self {
            ServerError::Unauthorized(rejection) => Some(rejection.reason().to_string()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                reason,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthRejection> for ServerError {
    fn from(rejection: AuthRejection) -> Self {
        ServerError::Unauthorized(rejection)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("inference task failed: {err}"))
    }
}
