//! Brute-force vector search over per-thread namespaces.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::{EmbedError, Result};
use crate::vector::{dot, unit_norm};

/// Largest k accepted by `search`.
const MAX_SEARCH_K: usize = 50;

/// One search hit, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub node_id: String,
    pub score: f32,
}

#[derive(Default)]
struct IndexInner {
    threads: HashMap<String, BTreeMap<String, Vec<f32>>>,
}

/// Shared vector index with one namespace per thread.
///
/// Search is an exact scan. Vectors are unit-normalized on insert, so the
/// dot product against a unit query is cosine similarity. Clones share the
/// same underlying state.
#[derive(Clone)]
pub struct VectorIndex {
    dim: usize,
    inner: Arc<RwLock<IndexInner>>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            inner: Arc::new(RwLock::new(IndexInner::default())),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Inserts or replaces one vector in a thread namespace.
    pub fn upsert(&self, thread_id: &str, node_id: impl Into<String>, vector: &[f32]) -> Result<()> {
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
        self.inner
            .write()
            .threads
            .entry(thread_id.to_string())
            .or_default()
            .insert(node_id, unit);
        Ok(())
    }

    /// Replaces a thread namespace wholesale. Rows with an empty id, an
    /// empty vector (the unembeddable marker) or a zero norm are dropped;
    /// a dimension mismatch fails the rebuild before it is applied.
    pub fn rebuild_thread<I, S>(&self, thread_id: &str, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut namespace: BTreeMap<String, Vec<f32>> = BTreeMap::new();
        for (id, vector) in rows {
            let id = id.into();
            if id.is_empty() || vector.is_empty() {
                continue;
            }
            if vector.len() != self.dim {
                return Err(EmbedError::DimensionMismatch {
                    node_id: id,
                    expected: self.dim,
                    got: vector.len(),
                });
            }
            let Some(unit) = unit_norm(&vector) else {
                continue;
            };
            namespace.insert(id, unit);
        }
        let count = namespace.len();
        self.inner
            .write()
            .threads
            .insert(thread_id.to_string(), namespace);
        debug!(thread_id, rows = count, "vector namespace rebuilt");
        Ok(count)
    }

    /// Drops a thread namespace, returning how many vectors it held.
    pub fn remove_thread(&self, thread_id: &str) -> usize {
        self.inner
            .write()
            .threads
            .remove(thread_id)
            .map_or(0, |ns| ns.len())
    }

    pub fn thread_len(&self, thread_id: &str) -> usize {
        self.inner
            .read()
            .threads
            .get(thread_id)
            .map_or(0, |ns| ns.len())
    }

    /// Top-k cosine neighbors of `query` within one thread namespace.
    ///
    /// `k` is clamped to 1..=50. Score ties break toward the smaller node
    /// id. A zero-norm query or an unknown thread yields no hits.
    pub fn search(&self, thread_id: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(EmbedError::QueryDimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        let Some(unit) = unit_norm(query) else {
            return Ok(Vec::new());
        };
        let k = k.clamp(1, MAX_SEARCH_K);

        let inner = self.inner.read();
        let Some(namespace) = inner.threads.get(thread_id) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<SearchHit> = namespace
            .iter()
            .map(|(id, vector)| SearchHit {
                node_id: id.clone(),
                score: dot(&unit, vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_index() -> VectorIndex {
        let index = VectorIndex::new(2);
        index.upsert("t1", "x-axis", &[1.0, 0.0]).unwrap();
        index.upsert("t1", "y-axis", &[0.0, 1.0]).unwrap();
        index.upsert("t1", "diagonal", &[1.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = seeded_index();
        let hits = index.search("t1", &[1.0, 0.0], 3).unwrap();
        let order: Vec<&str> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(order, vec!["x-axis", "diagonal", "y-axis"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_breaks_ties_by_node_id() {
        let index = VectorIndex::new(2);
        index.upsert("t1", "bbb", &[1.0, 0.0]).unwrap();
        index.upsert("t1", "aaa", &[2.0, 0.0]).unwrap();
        let hits = index.search("t1", &[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].node_id, "aaa");
        assert_eq!(hits[1].node_id, "bbb");
    }

    #[test]
    fn test_search_clamps_k() {
        let index = seeded_index();
        assert_eq!(index.search("t1", &[1.0, 0.0], 0).unwrap().len(), 1);
        assert_eq!(index.search("t1", &[1.0, 0.0], 100).unwrap().len(), 3);
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let index = seeded_index();
        let err = index.search("t1", &[1.0, 0.0, 0.0], 2).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::QueryDimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn test_search_zero_query_and_unknown_thread() {
        let index = seeded_index();
        assert!(index.search("t1", &[0.0, 0.0], 2).unwrap().is_empty());
        assert!(index.search("ghost", &[1.0, 0.0], 2).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_validates() {
        let index = VectorIndex::new(2);
        assert!(matches!(
            index.upsert("t1", "a", &[1.0]).unwrap_err(),
            EmbedError::DimensionMismatch { .. }
        ));
        assert!(matches!(
            index.upsert("t1", "a", &[0.0, 0.0]).unwrap_err(),
            EmbedError::ZeroNorm { .. }
        ));
    }

    #[test]
    fn test_rebuild_and_remove_thread() {
        let index = seeded_index();
        let count = index
            .rebuild_thread(
                "t1",
                vec![
                    ("only", vec![1.0, 0.0]),
                    ("", vec![0.0, 1.0]),
                    ("blank", vec![]),
                    ("zero", vec![0.0, 0.0]),
                ],
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.thread_len("t1"), 1);
        assert_eq!(index.remove_thread("t1"), 1);
        assert_eq!(index.thread_len("t1"), 0);
        assert_eq!(index.remove_thread("t1"), 0);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let index = seeded_index();
        index.upsert("t2", "other", &[0.0, 1.0]).unwrap();
        assert_eq!(index.search("t2", &[0.0, 1.0], 5).unwrap().len(), 1);
        assert_eq!(index.search("t1", &[0.0, 1.0], 5).unwrap().len(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let index = VectorIndex::new(2);
        let clone = index.clone();
        clone.upsert("t1", "a", &[1.0, 0.0]).unwrap();
        assert_eq!(index.thread_len("t1"), 1);
    }
}
