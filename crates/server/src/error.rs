//! HTTP error mapping.
//!
//! Every failure leaves the service as
//! `{ "success": false, "message": ..., "code": ..., "errors": [...] }`.
//! Internal failures are logged in full and answered with a generic message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use campus_ledger_state::{ReferralError, SessionError};
use campus_ledger_types::ErrorCode;
use campus_ledger_types::validation::ValidationError;
use serde::Serialize;
use snafu::Snafu;

/// Errors returned by HTTP handlers.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    /// Referral ledger rejection or failure.
    #[snafu(display("{source}"))]
    Referral { source: ReferralError },

    /// Session manager rejection or failure.
    #[snafu(display("{source}"))]
    Session { source: SessionError },

    /// Request body or parameters failed validation.
    #[snafu(display("{message}"))]
    Validation { message: String, errors: Vec<ValidationError> },

    /// Caller identity is missing or malformed.
    #[snafu(display("{message}"))]
    Unauthenticated { message: String },

    /// No route matched.
    #[snafu(display("Not found"))]
    NotFound,

    /// A blocking ledger task did not complete.
    #[snafu(display("Internal error: {message}"))]
    Internal { message: String },
}

impl From<ReferralError> for ApiError {
    fn from(source: ReferralError) -> Self {
        Self::Referral { source }
    }
}

impl From<SessionError> for ApiError {
    fn from(source: SessionError) -> Self {
        Self::Session { source }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: "Malformed request body".to_string(),
            errors: vec![ValidationError::new("body", rejection.body_text())],
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation {
            message: "Malformed path parameter".to_string(),
            errors: vec![ValidationError::new("path", rejection.body_text())],
        }
    }
}

impl ApiError {
    /// Builds a validation error from field failures.
    pub fn invalid(errors: Vec<ValidationError>) -> Self {
        Self::Validation { message: "Invalid request".to_string(), errors }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Referral { source } => source.code(),
            Self::Session { source } => source.code(),
            Self::Validation { .. } => ErrorCode::AppInvalidArgument,
            Self::NotFound => ErrorCode::AppNotFound,
            Self::Unauthenticated { .. } => ErrorCode::AppUnauthenticated,
            Self::Internal { .. } => ErrorCode::AppInternal,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ReferralSelfReferral
            | ErrorCode::ReferralAlreadyReferred
            | ErrorCode::AppInvalidArgument
            | ErrorCode::AppConfig => StatusCode::BAD_REQUEST,
            ErrorCode::ReferralInvalidCode
            | ErrorCode::ReferralStudentNotFound
            | ErrorCode::ReferralNotFound
            | ErrorCode::AppNotFound => StatusCode::NOT_FOUND,
            ErrorCode::SessionTokenNotFound
            | ErrorCode::SessionTokenInvalid
            | ErrorCode::SessionTokenReuseDetected
            | ErrorCode::AppUnauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::StorageTransaction => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StorageDatabaseOpen
            | ErrorCode::StorageTableOperation
            | ErrorCode::StorageCodec
            | ErrorCode::AppInternal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Session { source: SessionError::TokenReuseDetected { .. } } => {
                "Refresh token reuse detected; all sessions have been revoked".to_string()
            },
            Self::Session { source: SessionError::TokenNotFound | SessionError::TokenInvalid { .. } } => {
                "Invalid or expired refresh token".to_string()
            },
            _ if self.status().is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Numeric error code.
    pub code: u16,
    /// Per-field failures, for validation errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = %self.code(), "Request failed");
        }

        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            code: self.code().as_u16(),
            errors: match self {
                Self::Validation { errors, .. } => errors,
                _ => Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}
