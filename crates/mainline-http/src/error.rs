//! Error types for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An error from the analysis engine.
    #[error(transparent)]
    Core(#[from] mainline::Error),

    /// Query string or path parameters could not be parsed.
    #[error("{0}")]
    InvalidRequest(String),

    /// A blocking analysis task panicked or was cancelled.
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub detail: String,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(mainline::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(mainline::Error::InvalidInput(_)) | Self::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Core(mainline::Error::Connection { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for the response body, without the engine's category prefix.
    fn detail(&self) -> String {
        match self {
            Self::Core(mainline::Error::NotFound(msg) | mainline::Error::InvalidInput(msg)) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Graph store unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.detail()
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// Result type for request handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
