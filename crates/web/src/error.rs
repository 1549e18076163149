//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server errors are logged with the
//! request method and URI (attached by the request span) and captured to
//! Sentry; the client only ever sees the canonical status text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::forms::FormError;
use crate::middleware::session::SessionError;
use crate::render::RenderError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Template lookup or execution failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Form body could not be decoded.
    #[error("Form error: {0}")]
    Form(#[from] FormError),

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Form(FormError::Malformed(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_)
            | Self::Session(_)
            | Self::Render(_)
            | Self::Form(FormError::InvalidTarget(_))
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error");
        }

        // Don't expose error details to clients
        let message = status.canonical_reason().unwrap_or("Error");

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
