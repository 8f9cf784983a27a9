//! Common error types for SoilSense

use thiserror::Error;

/// Common result type for SoilSense operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SoilSense services
#[derive(Error, Debug)]
pub enum Error {
    /// Telemetry payload could not be parsed as a soil reading
    #[error("Telemetry parse error: {0}")]
    TelemetryParse(#[from] serde_json::Error),

    /// Control payload could not be parsed as a session control signal
    #[error("Control parse error: {0}")]
    ControlParse(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel or bus error
    #[error("Channel error: {0}")]
    Channel(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
