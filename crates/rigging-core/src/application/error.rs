//! Application layer errors.
//!
//! These errors represent failures in orchestration, not generation rules.
//! Rule violations are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while loading options or writing a synthesized project.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// An option file does not exist.
    #[error("Options file not found: {path}")]
    OptionsNotFound { path: PathBuf },

    /// An option file could not be read or parsed.
    #[error("Failed to load options from {path}: {reason}")]
    OptionsLoadFailed { path: PathBuf, reason: String },

    /// Option file format is not recognised.
    #[error("Unsupported options format '{extension}' for {path}")]
    UnsupportedOptionsFormat { path: PathBuf, extension: String },

    /// Output directory exists and overwriting was not allowed.
    #[error("Output directory already exists at {path}")]
    OutputExists { path: PathBuf },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::OptionsNotFound { path } => vec![
                format!("No file at {}", path.display()),
                "Paths are resolved relative to the current directory".into(),
            ],
            Self::OptionsLoadFailed { path, .. } => vec![
                format!("Check the syntax of {}", path.display()),
                "Option keys use camelCase, e.g. workflowNodeVersion".into(),
            ],
            Self::UnsupportedOptionsFormat { .. } => vec![
                "Options files must end in .toml, .yaml, .yml or .json".into(),
            ],
            Self::OutputExists { path } => vec![
                format!("Directory already exists: {}", path.display()),
                "Use --force to regenerate into it".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilesystemError { .. } => ErrorCategory::Internal,
            Self::OptionsLoadFailed { .. } | Self::UnsupportedOptionsFormat { .. } => {
                ErrorCategory::Configuration
            }
            Self::OptionsNotFound { .. } => ErrorCategory::NotFound,
            Self::OutputExists { .. } => ErrorCategory::Validation,
        }
    }
}
