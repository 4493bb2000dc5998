//! Error type definitions for strm-sync

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Filesystem failures that prevent a run from starting or finishing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization/deserialization failures
    #[error("Manifest serialization failed: {0}")]
    ManifestSerialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Another reconciliation run already holds the output-root lock
    #[error("Sync already in progress: lock file present at {path}")]
    RunInProgress { path: String },
}

impl AppError {
    /// Create a configuration error from any message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration {
            message: message.into(),
        }
    }
}
