//! Error types for DSV

use thiserror::Error;

/// Result type alias for DSV operations
pub type Result<T> = std::result::Result<T, DsvError>;

/// Main error type for DSV
#[derive(Error, Debug)]
pub enum DsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    #[error("Unknown geographic level: {0}")]
    UnknownGeographicLevel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
