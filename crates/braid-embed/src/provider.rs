//! Embedding provider seam.

use crate::error::Result;
use crate::vector::lexical_vector;

/// Produces embeddings for node text.
///
/// Implementations may call out to a real model; the engine only requires
/// the dimension to be stable and blank input to map to None.
pub trait EmbeddingProvider {
    /// Dimension of produced vectors.
    fn dim(&self) -> usize;

    /// Embeds one text. None means the text carries no signal.
    fn embed(&self, text: &str) -> Result<Option<Vec<f32>>>;
}

/// Fully offline provider that hashes whitespace tokens into a
/// fixed-dimension unit vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        Ok(lexical_vector(text, self.dim))
    }
}
