//! Error types for the picking stream processor.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller of a processing run.
///
/// Malformed input lines, read failures and deadline expiry are handled
/// inside the pipeline and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Writing the output document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the output document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Processor parameters out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
