//! Error types for CaseForge services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Error codes for machine-readable identification
//!
//! A case id matching no record is not an error at the repository level
//! (`Ok(None)`); handlers turn it into [`AppError::CaseNotFound`].

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidDate,

    // Resource errors (4xxx)
    CaseNotFound,

    // Storage errors (7xxx)
    StorageError,
    StorageUnavailable,

    // External service errors (8xxx)
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    ExportError,
    RenderError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidDate => 1002,

            ErrorCode::CaseNotFound => 4001,

            ErrorCode::StorageError => 7001,
            ErrorCode::StorageUnavailable => 7002,

            ErrorCode::UpstreamError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::ExportError => 9004,
            ErrorCode::RenderError => 9005,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid date for {field}: {value}")]
    InvalidDate { field: String, value: String },

    // Resource errors
    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: String },

    // Storage errors
    #[error("Storage returned {status}: {message}")]
    Storage { status: u16, message: String },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {message}")]
    Template { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidDate { .. } => ErrorCode::InvalidDate,
            AppError::CaseNotFound { .. } => ErrorCode::CaseNotFound,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration(_) => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Csv(_) => ErrorCode::ExportError,
            AppError::Template { .. } => ErrorCode::RenderError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidDate { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::CaseNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration(_)
            | AppError::Serialization(_)
            | AppError::Csv(_)
            | AppError::Template { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Storage { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Log the error at a level matching its severity
    pub fn log(&self) {
        let code = self.code();
        let status = self.status_code().as_u16();
        if self.is_server_error() {
            tracing::error!(error = %self, code = ?code, status, "Server error");
        } else {
            tracing::warn!(error = %self, code = ?code, status, "Client error");
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
