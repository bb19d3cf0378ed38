use axum::response::{IntoResponse, Response};
use axum_helpers::{ErrorCode, ErrorResponse};
use std::time::Duration;
use thiserror::Error;

/// Why a bounded wait on a lookup produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("Request was interrupted.")]
    Interrupted,

    #[error("There was an execution error: {0}")]
    Faulted(String),

    #[error("Request timed out.")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("User with userName '{0}' already exists")]
    AlreadyExists(String),

    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Lookup(#[from] WaitError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            IdentityError::AlreadyExists(_) => ErrorCode::Conflict,
            IdentityError::NotFound(_) => ErrorCode::NotFound,
            IdentityError::Validation(_) => ErrorCode::ValidationError,
            IdentityError::Unauthorized => ErrorCode::Unauthorized,
            IdentityError::Forbidden(_) => ErrorCode::Forbidden,
            IdentityError::Lookup(_) => ErrorCode::RequestTimeout,
            IdentityError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let code = self.code();

        let message = match &self {
            IdentityError::Lookup(wait) => {
                tracing::warn!(error = %wait, "Async lookup did not resolve");
                wait.to_string()
            }
            IdentityError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                code.default_message().to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse::new(code, message).into_response_with(code)
    }
}
