//! Unified error types for imgdrop

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all imgdrop operations
#[derive(Error, Debug)]
pub enum DropError {
    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Stale element handle: {0}")]
    Stale(String),

    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    // Run-level errors
    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Invalid menu choice: {0:?}")]
    InvalidChoice(String),

    #[error("File is not in the failed set: {0}")]
    InvalidFile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl DropError {
    /// Build a timeout error for a named wait
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }

    /// Whether a single file's processing may absorb this error and move on.
    ///
    /// Fatal conditions and bad interactive input end the run instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Fatal(_) | Self::InvalidChoice(_) | Self::InvalidFile(_) | Self::Config(_)
        )
    }
}

/// Result type alias using DropError
pub type Result<T> = std::result::Result<T, DropError>;
