//! API response types
//!
//! Every JSON body is either `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard success response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new success response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    /// Create a success response with metadata
    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an error response with details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Message shown for a dataset that is missing or owned by someone else.
pub const FORBIDDEN_DATASET: &str = "You do not have access to this dataset";

/// Application error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    ValidationError(String),
    SynthesisFailed(String),
    InternalError(String),
    Database(sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::SynthesisFailed(_) | AppError::InternalError(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            AppError::NotFound(msg) => ("NOT_FOUND", msg),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg),
            AppError::Conflict(msg) => ("CONFLICT", msg),
            AppError::ValidationError(msg) => ("VALIDATION_ERROR", msg),
            AppError::SynthesisFailed(msg) => {
                tracing::error!("Synthesis failed: {}", msg);
                ("SYNTHESIS_FAILED", "Synthetic data generation failed".to_string())
            },
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            },
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                ("INTERNAL_ERROR", "A database error occurred".to_string())
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::NotFound(msg) => AppError::NotFound(msg),
            crate::db::DbError::Duplicate(msg) => AppError::Conflict(msg),
            crate::db::DbError::Config(msg) => AppError::InternalError(msg),
            crate::db::DbError::Sqlx(err) => AppError::Database(err),
        }
    }
}

impl From<crate::registry::RegistryError> for AppError {
    fn from(err: crate::registry::RegistryError) -> Self {
        use crate::registry::RegistryError;
        match err {
            RegistryError::Forbidden => AppError::Forbidden(FORBIDDEN_DATASET.to_string()),
            RegistryError::DuplicatePath(_) => {
                AppError::Conflict("A dataset with this name is already stored".to_string())
            },
            RegistryError::Database(err) => AppError::Database(err),
            RegistryError::Io(err) => AppError::InternalError(err.to_string()),
            RegistryError::Storage(err) => AppError::InternalError(err.to_string()),
        }
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        use crate::storage::StorageError;
        match err {
            StorageError::NotFound => AppError::NotFound("The requested file does not exist".to_string()),
            StorageError::InvalidPlotName(_) => {
                AppError::ValidationError("Invalid plot file name".to_string())
            },
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl From<crate::context::WorkerError> for AppError {
    fn from(err: crate::context::WorkerError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;
