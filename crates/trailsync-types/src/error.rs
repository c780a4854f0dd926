//! Error types for parsing trailsync domain values.

use thiserror::Error;

/// Errors that can occur when parsing partition keys and timestamps.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The string is not a `YYYY_MM_DD` key naming a real calendar date.
    #[error("Invalid partition key: {0}")]
    InvalidPartitionKey(String),

    /// The string is not an ISO-8601 / RFC 3339 timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type alias using trailsync-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
