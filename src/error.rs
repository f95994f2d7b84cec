//! Caller-facing error taxonomy shared by both endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

/// Result type for request handling
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned to the caller. The message of every variant except
/// `Internal` is safe to show verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("User must be authenticated")]
    Unauthenticated,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    ResourceExhausted(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    /// Carries the detail for server logs only
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Wire code, matching the callable-function error codes clients expect
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::PermissionDenied(_) => "permission-denied",
            ApiError::ResourceExhausted(_) => "resource-exhausted",
            ApiError::InvalidArgument(_) => "invalid-argument",
            ApiError::NotFound(_) => "not-found",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the caller
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref detail) = self {
            tracing::error!(error = %detail, "Internal error");
        }

        let body = json!({
            "success": false,
            "code": self.code(),
            "message": self.public_message(),
        });

        (self.status(), Json(body)).into_response()
    }
}
