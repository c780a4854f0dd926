//! Error types for trailsync-store.

use std::path::PathBuf;

/// Result type for trailsync-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trailsync-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store rejected the operation or could not be reached.
    #[error("Storage unavailable: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A registry row does not hold a valid partition key.
    #[error("Corrupt partition registry: {0}")]
    CorruptRegistry(#[from] trailsync_types::ParseError),

    /// A timestamp cannot be represented in storage.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
