//! Error types for ctm-web
//!
//! Handlers that change state report validation and authorization failures
//! as flash messages (see [`crate::api::finish`]). Everything that reaches
//! [`ApiError`] is rendered as a small HTML error page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::html;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ctm-common error
    #[error(transparent)]
    Common(#[from] ctm_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use ctm_common::Error as Common;
        match self {
            ApiError::NotFound(_) | ApiError::Common(Common::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Common(Common::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Common(Common::Forbidden(_)) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(ctm_common::Error::Database(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, html::error_page(status, &self.to_string())).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
