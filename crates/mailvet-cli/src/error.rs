//! Error types for the mailvet CLI
//!
//! User-facing error type with clear, actionable messages.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// The verification service answered with an error
    #[error(
        "Server error: {0}. Ensure the verification service is running and reachable \
         (check with 'mailvet stats')."
    )]
    Api(String),

    /// No address could be extracted from the submitted input
    #[error(
        "No email addresses found in the input. \
         Provide at least one address such as 'user@example.com'."
    )]
    EmptySubmission,

    /// A run ended in the failed state
    #[error("Verification run failed: {0}. Resubmit the batch to try again.")]
    RunFailed(String),

    /// The batch name directory could not be read or written
    #[error("Batch name directory error: {0}. Check permissions on the mailvet data directory.")]
    NameDirectory(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your network connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or command-line flags.")]
    Config(String),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Shared domain error
    #[error(transparent)]
    Common(#[from] mailvet_common::VerifierError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a name directory error
    pub fn name_directory(msg: impl Into<String>) -> Self {
        Self::NameDirectory(msg.into())
    }

    /// Create a run failure error
    pub fn run_failed(msg: impl Into<String>) -> Self {
        Self::RunFailed(msg.into())
    }
}
