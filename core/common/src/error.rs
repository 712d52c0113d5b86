//! Common error types for hashsync.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for hashsync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An exclusion list could not be loaded.
    #[error("Exclusion list error: {0}")]
    Exclusion(String),

    /// The remote bucket could not be reached.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Remote metadata check failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Local file could not be read while computing its digest.
    #[error("Failed to hash {}: {source}", path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transfer to the remote store failed.
    #[error("Upload error: {0}")]
    Upload(String),

    /// A network call did not complete in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
