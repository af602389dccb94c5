//! Core error types for braid.

use thiserror::Error;

/// Errors that can occur in core configuration and parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Config file could not be read
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Unknown traversal direction keyword
    #[error("unknown direction: {0} (expected out, in or both)")]
    UnknownDirection(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
