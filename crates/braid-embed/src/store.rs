//! In-memory storage for node embeddings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use braid_core::NodeView;

use crate::error::{EmbedError, Result};
use crate::vector::unit_norm;

/// Unit-normalized embeddings for one thread's nodes.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    dim: usize,
    rows: BTreeMap<String, Vec<f32>>,
}

/// How much of a thread's text carries an embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_text_nodes: usize,
    pub embedded_nodes: usize,
    /// Percentage rounded to two decimals. 100.0 when there is nothing to
    /// embed.
    pub coverage_percent: f64,
    pub indexing_incomplete: bool,
}

impl EmbeddingStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: BTreeMap::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.rows.contains_key(node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<&[f32]> {
        self.rows.get(node_id).map(|v| v.as_slice())
    }

    /// Stores a vector under `node_id`, unit-normalizing it first.
    pub fn insert(&mut self, node_id: impl Into<String>, vector: &[f32]) -> Result<()> {
        let node_id = node_id.into();
        if vector.len() != self.dim {
            return Err(EmbedError::DimensionMismatch {
                node_id,
                expected: self.dim,
                got: vector.len(),
            });
        }
        let Some(unit) = unit_norm(vector) else {
            return Err(EmbedError::ZeroNorm { node_id });
        };
        self.rows.insert(node_id, unit);
        Ok(())
    }

    /// Builds a store from `(node id, vector)` rows. Rows with an empty id,
    /// an empty vector (the unembeddable marker) or a zero norm are
    /// dropped; a dimension mismatch fails the whole load.
    pub fn from_rows<I, S>(dim: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut store = Self::new(dim);
        for (id, vector) in rows {
            let id = id.into();
            if id.is_empty() || vector.is_empty() {
                continue;
            }
            match store.insert(id, &vector) {
                Ok(()) | Err(EmbedError::ZeroNorm { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(store)
    }

    /// Coverage over the nodes that carry text.
    pub fn coverage(&self, nodes: &[NodeView]) -> CoverageReport {
        let mut total = 0usize;
        let mut embedded = 0usize;
        for node in nodes {
            if node.text_or_empty().trim().is_empty() {
                continue;
            }
            total += 1;
            if self.rows.contains_key(node.id.as_str()) {
                embedded += 1;
            }
        }
        let coverage_percent = if total == 0 {
            100.0
        } else {
            (embedded as f64 / total as f64 * 10000.0).round() / 100.0
        };
        CoverageReport {
            total_text_nodes: total,
            embedded_nodes: embedded,
            coverage_percent,
            indexing_incomplete: embedded < total,
        }
    }

    /// All rows, ordered by node id.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.rows.iter().map(|(id, v)| (id.as_str(), v.as_slice()))
    }
}
