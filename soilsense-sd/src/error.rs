//! Error types for soilsense-sd
//!
//! Defines daemon-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the session daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier artifact loading or validation errors
    #[error("Model error: {0}")]
    Model(String),

    /// Scaling or classification failure during aggregation
    #[error("Classification error: {0}")]
    Classification(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the common library
    #[error(transparent)]
    Common(#[from] soilsense_common::Error),
}

/// Convenience Result type using soilsense-sd Error
pub type Result<T> = std::result::Result<T, Error>;
