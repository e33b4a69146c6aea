//! API error handling
//!
//! Maps the core taxonomy onto HTTP statuses with JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use depot_core::error::DepotError;
use serde::Serialize;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unprocessable(_) => "unprocessable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<DepotError> for ApiError {
    fn from(err: DepotError) -> Self {
        match err {
            DepotError::NotFound(msg) => ApiError::NotFound(msg),
            DepotError::InvalidIdentifier(msg) => ApiError::BadRequest(msg),
            DepotError::InvalidDimensions(msg) => ApiError::BadRequest(msg),
            DepotError::ImmutableField(field) => {
                ApiError::Unprocessable(format!("field '{}' cannot be changed", field))
            }
            DepotError::Io(err) => ApiError::Internal(err.to_string()),
            DepotError::Image(msg) => ApiError::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            message: match self {
                ApiError::NotFound(msg)
                | ApiError::BadRequest(msg)
                | ApiError::Unprocessable(msg)
                | ApiError::Internal(msg) => msg,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
