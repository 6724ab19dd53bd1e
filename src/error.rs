//! Error types for the restic exporter.
//!
//! This module defines custom error types using `thiserror` for structured
//! error handling throughout the application.

use thiserror::Error;

/// Main error type for restic exporter operations.
#[derive(Debug, Error)]
pub enum ResticError {
    /// Error invoking the restic binary
    #[error("restic command failed: {0}")]
    Command(String),

    /// Restic invocation exceeded the configured timeout
    #[error("restic command timed out after {0} seconds")]
    Timeout(u64),

    /// Error parsing restic output
    #[error("Failed to parse restic output: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Metrics error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// HTTP server error
    #[error("HTTP server error: {0}")]
    Server(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for restic exporter operations.
pub type Result<T> = std::result::Result<T, ResticError>;
