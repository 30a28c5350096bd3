//! Error handling for the Practice Journal server
//!
//! Every failure leaves the API as `{"error": {"code", "message", "field"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{PracticeError, SettingsError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Practice record lifecycle errors
    #[error("Approval request has expired")]
    ApprovalExpired,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl AppError {
    /// HTTP status and body for this error
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid username or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "Forbidden: Insufficient permissions",
                ),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorDetail::new("FORBIDDEN", msg)),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", msg),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A user with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorDetail::new("CONFLICT", msg)),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::ApprovalExpired => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("APPROVAL_EXPIRED", "Approval request has expired"),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg),
            ),
            AppError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "EXTERNAL_SERVICE_ERROR",
                    format!("External service error: {}", msg),
                ),
            ),
            AppError::StorageError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("STORAGE_ERROR", format!("Storage error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl From<PracticeError> for AppError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::InvalidDay(_) => AppError::Validation {
                field: "day".to_string(),
                message: "Invalid day".to_string(),
            },
            PracticeError::InvalidMinutes { .. } => AppError::Validation {
                field: "minutes".to_string(),
                message: err.to_string(),
            },
            PracticeError::InvalidPhone => AppError::Validation {
                field: "parent_phone_number".to_string(),
                message: err.to_string(),
            },
            PracticeError::AlreadySigned => AppError::InvalidStateTransition(err.to_string()),
            PracticeError::NoPendingApproval => {
                AppError::NotFound("Pending practice record".to_string())
            }
            PracticeError::ApprovalExpired => AppError::ApprovalExpired,
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::Validation {
            field: err.field.to_string(),
            message: err.message,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, field_errors)) => AppError::Validation {
                field: field.to_string(),
                message: field_errors
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field)),
            },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_practice_errors_map_to_statuses() {
        let cases = [
            (PracticeError::InvalidDay("funday".into()), StatusCode::BAD_REQUEST),
            (PracticeError::InvalidMinutes { max: 1440 }, StatusCode::BAD_REQUEST),
            (PracticeError::InvalidPhone, StatusCode::BAD_REQUEST),
            (PracticeError::AlreadySigned, StatusCode::CONFLICT),
            (PracticeError::NoPendingApproval, StatusCode::NOT_FOUND),
            (PracticeError::ApprovalExpired, StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let (status, _) = AppError::from(err).status_and_detail();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_pending_not_found_message() {
        let (_, detail) = AppError::from(PracticeError::NoPendingApproval).status_and_detail();
        assert_eq!(detail.message, "Pending practice record not found");
    }

    #[test]
    fn test_settings_error_keeps_field() {
        let err = SettingsError {
            field: "week_start_day",
            message: "bad".to_string(),
        };
        let (status, detail) = AppError::from(err).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("week_start_day"));
    }

    #[test]
    fn test_validator_errors_name_first_field() {
        use validator::Validate;

        #[derive(Validate)]
        struct Login {
            #[validate(length(min = 1, message = "Password is required"))]
            password: String,
            #[validate(length(min = 1, message = "Username is required"))]
            username: String,
        }

        let errors = Login {
            password: String::new(),
            username: String::new(),
        }
        .validate()
        .unwrap_err();
        let (status, detail) = AppError::from(errors).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("password"));
        assert_eq!(detail.message, "Password is required");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let (status, detail) =
            AppError::Internal("bcrypt exploded".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!detail.message.contains("bcrypt"));
    }
}
