//! Error types for the ROM measurement library.
//!
//! Per-frame conditions (low landmark confidence, anchor drift, pelvic
//! compensation) are not errors; they are reported through
//! [`crate::session::LiveStatus`]. Only conditions the caller has to act on
//! surface here.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Unmapped joint/movement combination or unregistered joint key.
    /// Indicates a registry bug; the session must not continue.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The persistence collaborator rejected a confirmed measurement
    #[error("Failed to save measurement: {0}")]
    SaveFailure(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Configuration file could not be parsed or failed validation
    #[error("Config file error: {0}")]
    ConfigError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The engine worker is gone or its channels are closed
    #[error("Engine channel closed: {0}")]
    ChannelClosed(String),
}

/// Application-specific error type (alias for main Error type)
pub type AppError = Error;

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
