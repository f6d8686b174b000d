//! Error types for the workout_core library.
//!
//! The pipeline stages themselves never fail; these errors cover the
//! surrounding surfaces (configuration, reading responses from disk).

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Duration catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
