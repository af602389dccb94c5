//! Error types for embedding storage and search.

use thiserror::Error;

/// Errors raised by the embedding store and the vector index.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// A stored vector's length does not match the configured dimension.
    #[error("vector for '{node_id}' has dimension {got}, expected {expected}")]
    DimensionMismatch {
        node_id: String,
        expected: usize,
        got: usize,
    },

    /// A query vector's length does not match the index dimension.
    #[error("query has dimension {got}, expected {expected}")]
    QueryDimensionMismatch { expected: usize, got: usize },

    /// A vector with no magnitude cannot be stored.
    #[error("vector for '{node_id}' has zero norm")]
    ZeroNorm { node_id: String },
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;
