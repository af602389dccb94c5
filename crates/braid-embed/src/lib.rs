//! Braid Embedding Layer
//!
//! Vector plumbing for the engine: a fully offline hashing embedder, a
//! dimension-checked embedding store and a brute-force cosine index with
//! one namespace per thread. Nothing in this crate talks to the network.

mod error;
mod index;
mod provider;
mod store;
mod vector;

pub use error::{EmbedError, Result};
pub use index::{SearchHit, VectorIndex};
pub use provider::{EmbeddingProvider, HashingEmbedder};
pub use store::{CoverageReport, EmbeddingStore};
pub use vector::{dot, lexical_vector, mean_unit, unit_norm};
