//! Server error types.
//!
//! [`ServerError`] implements `IntoResponse`, so JSON handlers can use `?`
//! and still answer with a status code and an [`ErrorResponse`] body.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use caldash_core::TracingError;
use caldash_providers::{ProviderError, ProviderErrorCode};
use serde::Serialize;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// JSON error body returned by API routes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error (listener, config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Logging could not be set up.
    #[error("Tracing error: {0}")]
    Tracing(#[from] TracingError),

    /// The identity or calendar service failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// No signed-in session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request data.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config { .. } | Self::Io(_) | Self::Tracing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Provider(e) => match e.code() {
                ProviderErrorCode::AuthenticationFailed => StatusCode::UNAUTHORIZED,
                ProviderErrorCode::AuthorizationFailed => StatusCode::FORBIDDEN,
                ProviderErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ProviderErrorCode::BadRequest => StatusCode::BAD_REQUEST,
                ProviderErrorCode::NetworkError
                | ProviderErrorCode::ServerError
                | ProviderErrorCode::InvalidResponse => StatusCode::BAD_GATEWAY,
                ProviderErrorCode::ConfigurationError | ProviderErrorCode::InternalError => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match &self {
            Self::Config { .. } | Self::Io(_) | Self::Tracing(_) => {
                tracing::error!(error = %self, "internal error");
                ("Internal server error".to_string(), None)
            }
            Self::Provider(e) => {
                tracing::warn!(error = %e, "provider error");
                (e.code().as_str().to_string(), Some(e.message().to_string()))
            }
            Self::Unauthorized(msg) => ("Unauthorized".to_string(), Some(msg.clone())),
            Self::BadRequest(msg) => ("Invalid request".to_string(), Some(msg.clone())),
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
