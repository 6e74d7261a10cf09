//! Error types for mailvet

use thiserror::Error;

/// Result type alias for mailvet operations
pub type Result<T> = std::result::Result<T, VerifierError>;

/// Main error type shared by mailvet crates
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown verification category: {0}")]
    InvalidCategory(String),

    #[error("Unknown batch status: {0}")]
    InvalidStatus(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
