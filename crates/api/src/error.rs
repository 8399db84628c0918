//! HTTP error mapping.
//!
//! Client errors are answered with a 4xx status and a descriptive message.
//! Storage failures are logged and answered with a generic 500, so no
//! database detail ever reaches the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use tally_core::error::{DomainError, StorageError};
use tally_core::metrics::record_api_error;

/// Message sent for every server-side failure.
pub const LOAD_FAILURE_MESSAGE: &str = "unable to load data";

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The owner header is missing or malformed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Domain(DomainError::Storage(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Domain(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidCursor(_)) => "invalid_cursor",
            Self::Domain(DomainError::InvalidQuery(_)) => "invalid_query",
            Self::Domain(DomainError::ValueOutOfRange(_)) => "value_out_of_range",
            Self::Domain(DomainError::Storage(_)) => "internal",
            Self::Unauthorized(_) => "unauthorized",
        }
    }

    /// Message safe to show to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Domain(DomainError::Storage(_)) => LOAD_FAILURE_MESSAGE.to_string(),
            Self::Domain(err) => err.to_string(),
            Self::Unauthorized(reason) => reason.clone(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        record_api_error(code);

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(code, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: self.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}
