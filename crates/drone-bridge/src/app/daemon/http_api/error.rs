use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use thiserror::Error;

use crate::usecases::ports::LaunchError;
use crate::usecases::ports::LinkError;
use crate::usecases::ports::PathError;

#[derive(Debug, Error)]
pub(crate) enum ApiServerError {
    #[error("Invalid listen address '{listen}': {message}")]
    InvalidListen { listen: String, message: String },
    #[error("Control server I/O error ({operation}): {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ApiServerError {
    pub(crate) fn into_launch_error(self, listen: &str) -> LaunchError {
        match self {
            ApiServerError::InvalidListen { message, .. } => LaunchError::Bind {
                listen: listen.to_string(),
                reason: message,
            },
            ApiServerError::Io {
                operation: "bind",
                source,
            } => LaunchError::Bind {
                listen: listen.to_string(),
                reason: source.to_string(),
            },
            other => LaunchError::ServerThread(other.to_string()),
        }
    }
}

/// Per-request failure rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("{0}")]
    InvalidBody(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::Link(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Link(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Path(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
