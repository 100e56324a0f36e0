//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`ClearCaseError`] which covers every failure mode of the
//! cleartool client core. It uses `thiserror` for ergonomic error definitions and
//! includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`ClearCaseError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, ClearCaseError>`
//!
//! # Error Categories
//! - **Environment**: missing working directory, executable or temp directory
//! - **Tool invocation**: cleartool exited non-zero and wrote to stderr
//! - **Supersession**: an invocation was killed by a newer one with the same identity
//! - **Configuration**: unreadable settings, invalid regex, restart-only changes

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for clearcase-navigator
#[derive(Error, Debug)]
pub enum ClearCaseError {
    // Environment errors
    #[error("Working directory does not exist: {path}")]
    WorkingDirectoryMissing { path: PathBuf },

    #[error("Executable not found: {program}")]
    ExecutableNotFound { program: String },

    #[error("Temporary directory does not exist: {path}")]
    TempDirectoryMissing { path: PathBuf },

    #[error("File does not exist: {path}")]
    FileNotFound { path: PathBuf },

    // Tool invocation errors
    #[error("cleartool {} failed (exit code {}): {}", .argv.join(" "), exit_code_label(.exit_code), .stderr.trim())]
    ToolInvocation {
        argv: Vec<String>,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Operation '{operation}' was superseded by a newer invocation")]
    Superseded { operation: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("A version qualifier can only address a single file (got {count} files)")]
    VersionWithMultipleFiles { count: usize },

    // Configuration errors
    #[error("Setting '{property}' changed; restart to apply it")]
    ConfigurationDrift { property: String },

    #[error("Failed to read settings file '{path}': {source}")]
    ConfigReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    ConfigParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid view-private filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    // Cache errors
    #[error("Could not find cache directory")]
    CacheDirectoryNotFound,

    #[error("Failed to write cache file '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

/// Convenience type alias for Results using ClearCaseError
pub type Result<T> = std::result::Result<T, ClearCaseError>;

impl ClearCaseError {
    /// Create a working directory missing error
    pub fn working_directory_missing(path: impl Into<PathBuf>) -> Self {
        Self::WorkingDirectoryMissing { path: path.into() }
    }

    /// Create an executable not found error
    pub fn executable_not_found(program: impl Into<String>) -> Self {
        Self::ExecutableNotFound {
            program: program.into(),
        }
    }

    /// Create a temp directory missing error
    pub fn temp_directory_missing(path: impl Into<PathBuf>) -> Self {
        Self::TempDirectoryMissing { path: path.into() }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a tool invocation error
    pub fn tool_invocation(argv: Vec<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ToolInvocation {
            argv,
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a superseded error for an operation identity
    pub fn superseded(operation: impl Into<String>) -> Self {
        Self::Superseded {
            operation: operation.into(),
        }
    }

    /// Create a configuration drift warning for a restart-only property
    pub fn configuration_drift(property: impl Into<String>) -> Self {
        Self::ConfigurationDrift {
            property: property.into(),
        }
    }

    /// Create a settings read error
    pub fn config_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a settings parse error
    pub fn config_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a cache write failed error
    pub fn cache_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    /// Errors that come from the environment rather than from cleartool itself.
    /// These are shown to the user and never retried.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::WorkingDirectoryMissing { .. }
                | Self::ExecutableNotFound { .. }
                | Self::TempDirectoryMissing { .. }
        )
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}
