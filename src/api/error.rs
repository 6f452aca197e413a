//! Unified API error handling.
//!
//! Every error leaves the server as `{"error": {"code", "message", "details?"}}`
//! with a matching HTTP status. Internal failures are logged in full and
//! reported with a generic message. The detail travels in the response
//! extensions so a development-only layer can put it back into the body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crypto::TokenError;
use crate::db::StoreError;
use crate::engine::BookingError;

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";


/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    ValidationError,

    // Server errors (5xx)
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::TooManyRequests => "too_many_requests",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The inner error object in the response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// The full error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Detail of an internal error, attached to the response extensions.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    /// HTTP status code (defaults to code's default status)
    status: StatusCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
    internal_detail: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
            details: None,
            internal_detail: None,
        }
    }

    /// Override the HTTP status code
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Missing credentials (401)
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Credentials presented but rejected (403)
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Validation error (400) with field-level details
    pub fn validation(errors: HashMap<String, Vec<String>>) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        let mut err = Self::new(ErrorCode::ValidationError, message);
        err.details = Some(errors);
        err
    }

    /// Internal server error (500). `detail` is always logged; the body
    /// carries a generic message.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        let detail = detail.to_string();
        tracing::error!("Internal error: {}", detail);
        let mut err = Self::new(ErrorCode::InternalError, GENERIC_INTERNAL_MESSAGE);
        err.internal_detail = Some(detail);
        err
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
                details: self.details,
            },
        };

        let mut response = (self.status, Json(response)).into_response();
        if let Some(detail) = self.internal_detail {
            response.extensions_mut().insert(InternalErrorDetail(detail));
        }
        response
    }
}

/// Response layer for development: rewrites internal error bodies to include
/// the underlying detail.
pub async fn expose_internal_detail(mut response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) = response.extensions_mut().remove::<InternalErrorDetail>()
    else {
        return response;
    };

    let body = ErrorResponse {
        error: ErrorBody {
            code: ErrorCode::InternalError.as_str().to_string(),
            message: format!("{}: {}", GENERIC_INTERNAL_MESSAGE, detail),
            details: None,
        },
    };
    (response.status(), Json(body)).into_response()
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

// -------------------------------------------------------------------------
// Conversions from domain errors
// -------------------------------------------------------------------------

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::Invalid(msg) => ApiError::bad_request(msg),
            StoreError::Corrupt(_) | StoreError::Database(_) | StoreError::Serialization(_) => {
                ApiError::internal(err)
            }
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::ListingNotFound(_) => ApiError::not_found(err.to_string()),
            BookingError::Store(e) => e.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid => ApiError::forbidden(err.to_string()),
            TokenError::Signing(_) => ApiError::internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// -------------------------------------------------------------------------
// Builder for validation errors
// -------------------------------------------------------------------------

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Return Ok(()) if no errors, or Err(ApiError) if there are errors
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}
