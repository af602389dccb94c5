//! Hierarchy build errors.

use thiserror::Error;

/// Errors raised while building a hierarchy preview.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// A supplied embedding does not match the configured dimension.
    #[error("embedding for '{node_id}' has dimension {got}, expected {expected}")]
    DimensionMismatch {
        node_id: String,
        expected: usize,
        got: usize,
    },
}

/// Result alias for hierarchy operations.
pub type Result<T> = std::result::Result<T, HierarchyError>;
