//! Error types and handling for the fzweb server

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;

use crate::search::{EngineError, WalkError};

/// Longest query accepted by the search endpoint, in characters
pub const MAX_QUERY_CHARS: usize = 500;

/// Application error types
#[derive(Debug, Serialize)]
pub enum AppError {
    /// Malformed body or missing required parameter
    InvalidRequest(String),
    /// Search root does not exist or is not a directory
    DirectoryNotFound(String),
    /// Resolved path escapes its root
    AccessDenied(String),
    /// Download target absent
    FileNotFound(String),
    /// Walk below the search root hit an unreadable entry
    EnumerationFailed(String),
    /// Match engine exited abnormally or rejected its options
    EngineFailure(String),
    /// Search deadline expired
    Timeout(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::DirectoryNotFound(msg) => write!(f, "Directory not found: {}", msg),
            AppError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            AppError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            AppError::EnumerationFailed(msg) => write!(f, "Enumeration failed: {}", msg),
            AppError::EngineFailure(msg) => write!(f, "Search failed: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Get the stable error code used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DirectoryNotFound(_) => "directory_not_found",
            AppError::AccessDenied(_) => "access_denied",
            AppError::FileNotFound(_) => "file_not_found",
            AppError::EnumerationFailed(_) => "enumeration_failed",
            AppError::EngineFailure(_) => "engine_failure",
            AppError::Timeout(_) => "timeout",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used when the error is reported as a bare status response
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DirectoryNotFound(_) | AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::EnumerationFailed(_)
            | AppError::EngineFailure(_)
            | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert serde_json::Error to AppError
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

/// Convert std::io::Error to AppError
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => AppError::AccessDenied(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Enumeration failures abort the whole search
impl From<WalkError> for AppError {
    fn from(err: WalkError) -> Self {
        if err.at_root() && err.kind() == std::io::ErrorKind::NotFound {
            AppError::DirectoryNotFound(err.path().display().to_string())
        } else {
            AppError::EnumerationFailed(err.to_string())
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::EngineFailure(err.to_string())
    }
}

/// Validation functions
pub fn validate_query(query: &str) -> Result<(), AppError> {
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "Query too long, maximum {} characters",
            MAX_QUERY_CHARS
        )));
    }

    if query.contains(['\n', '\r']) {
        return Err(AppError::InvalidRequest(
            "Query must be a single line".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_download_file(file: Option<&str>) -> Result<&str, AppError> {
    match file {
        Some(f) if !f.is_empty() => Ok(f),
        _ => Err(AppError::InvalidRequest("Missing file parameter".to_string())),
    }
}
