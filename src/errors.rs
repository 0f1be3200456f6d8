//! # Application Error Types
//!
//! This module defines common error types used throughout the ocr-prep crate.
//! It provides structured error handling for configuration, preprocessing and
//! the file-based pipeline.

use std::fmt;

use crate::preprocessing::PreprocessingError;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (aspect ratios, regions, CLI input, etc.)
    Validation(String),
    /// Crop or binarization failures
    Preprocessing(String),
    /// File system errors
    FileSystem(String),
    /// Batch processing was cancelled before completion
    Cancelled(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Preprocessing(msg) => write!(f, "[PREPROCESSING] {}", msg),
            AppError::FileSystem(msg) => write!(f, "[FILESYSTEM] {}", msg),
            AppError::Cancelled(msg) => write!(f, "[CANCELLED] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PreprocessingError> for AppError {
    fn from(err: PreprocessingError) -> Self {
        AppError::Preprocessing(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON serialization failed: {}", err))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the crate
pub mod error_logging {
    use tracing::error;

    /// Log crop/binarize failures with raster context
    pub fn log_preprocessing_error(
        error: &impl std::fmt::Display,
        operation: &str,
        dimensions: Option<(u32, u32)>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            dimensions = ?dimensions,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Image preprocessing failed"
        );
    }

    /// Log file system errors with path and operation context
    pub fn log_filesystem_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            "File system operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_bracketed_tags() {
        assert_eq!(
            AppError::Config("bad".to_string()).to_string(),
            "[CONFIG] bad"
        );
        assert_eq!(
            AppError::Cancelled("stop".to_string()).to_string(),
            "[CANCELLED] stop"
        );
    }

    #[test]
    fn test_preprocessing_error_conversion() {
        let err: AppError = PreprocessingError::EmptyImage.into();
        assert!(matches!(err, AppError::Preprocessing(_)));
        assert!(err.to_string().contains("zero pixels"));
    }
}
