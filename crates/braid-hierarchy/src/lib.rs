//! Braid Hierarchy Builder
//!
//! Turns a selection of thread nodes into a deterministic map view: a
//! cluster tree grown by cosine bisection over node embeddings, with
//! structural groups (unfolded folds, split parts) preserved as pre-made
//! subtrees. Nodes without a usable embedding fall back to a hashed
//! lexical vector, so the build never depends on an embedding service.

mod cluster;
mod error;
mod item;
mod layout;
mod tree;

use std::collections::HashMap;

use tracing::debug;

use braid_core::{ordered_unique, EdgeView, EngineConfig, NodeView};
use braid_embed::{lexical_vector, unit_norm};

use crate::cluster::{build_tree, BuildCtx};
use crate::item::collect_items;
use crate::layout::layout_leaves;

pub use error::{HierarchyError, Result};
pub use tree::{ClusterKind, ClusterNode, HierarchyPreview, HierarchyStats, LeafPlacement};

/// Options for one hierarchy build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyOptions {
    /// Leaf capacity per cluster before a level splits; clamped to at
    /// least 2.
    pub max_leaf_size: usize,
    /// Expected embedding dimension, also used for lexical fallbacks.
    pub dim: usize,
}

impl HierarchyOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_leaf_size: config.hierarchy.max_leaf_size,
            dim: config.embed_dim,
        }
    }

    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Builds the preview tree for the given node selection.
///
/// Supplied embeddings are validated against `options.dim` and
/// unit-normalized; nodes without one fall back to a hashed vector over
/// their text, and nodes with no text at all cluster by position only.
/// The same snapshot always produces the same tree.
pub fn build_hierarchy_preview(
    nodes: &[NodeView],
    edges: &[EdgeView],
    embeddings: &HashMap<String, Vec<f32>>,
    options: &HierarchyOptions,
) -> Result<HierarchyPreview> {
    let max_leaf_size = usize::max(2, options.max_leaf_size);

    let selected: Vec<&NodeView> = {
        let mut by_id: HashMap<&str, &NodeView> = HashMap::new();
        for node in nodes.iter().filter(|n| !n.id.is_empty()) {
            by_id.entry(node.id.as_str()).or_insert(node);
        }
        ordered_unique(nodes.iter().map(|n| n.id.as_str()))
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect()
    };

    if selected.is_empty() {
        return Ok(HierarchyPreview {
            tree: empty_root(),
            leaf_placements: Vec::new(),
            node_depths: Default::default(),
            stats: HierarchyStats {
                selected_nodes: 0,
                clustered_nodes: 0,
                max_leaf_size,
                top_groups: 0,
            },
        });
    }

    let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
    for node in &selected {
        if let Some(vector) = resolve_vector(node, embeddings, options.dim)? {
            vectors.insert(node.id.clone(), vector);
        }
    }

    let (items, top_groups) = collect_items(&selected, edges, &vectors);

    let ctx = BuildCtx {
        nodes_by_id: selected.iter().map(|n| (n.id.as_str(), *n)).collect(),
    };
    let mut counter: u64 = 1;
    let mut tree = build_tree(items, 0, &mut counter, max_leaf_size, &ctx);
    tree.id = "root".to_string();
    tree.kind = ClusterKind::Root;
    if tree.label.is_empty() {
        tree.label = "Hierarchy".to_string();
    }

    let (leaf_placements, node_depths) = layout_leaves(&tree);

    debug!(
        selected = selected.len(),
        clustered = leaf_placements.len(),
        groups = top_groups,
        "hierarchy preview built"
    );

    Ok(HierarchyPreview {
        stats: HierarchyStats {
            selected_nodes: selected.len(),
            clustered_nodes: leaf_placements.len(),
            max_leaf_size,
            top_groups,
        },
        tree,
        leaf_placements,
        node_depths,
    })
}

/// Resolves the clustering vector for one node. An empty supplied
/// embedding means the node was unembeddable and falls through to the
/// lexical fallback, as does a zero-norm one; any other dimension
/// disagreement is a hard error.
fn resolve_vector(
    node: &NodeView,
    embeddings: &HashMap<String, Vec<f32>>,
    dim: usize,
) -> Result<Option<Vec<f32>>> {
    if let Some(raw) = embeddings.get(node.id.as_str()).filter(|v| !v.is_empty()) {
        if raw.len() != dim {
            return Err(HierarchyError::DimensionMismatch {
                node_id: node.id.clone(),
                expected: dim,
                got: raw.len(),
            });
        }
        if let Some(unit) = unit_norm(raw) {
            return Ok(Some(unit));
        }
    }
    let text = node.text_or_empty().trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(lexical_vector(text, dim))
}

fn empty_root() -> ClusterNode {
    ClusterNode {
        id: "root".to_string(),
        kind: ClusterKind::Root,
        label: "Hierarchy".to_string(),
        children: Vec::new(),
        leaf_node_ids: Vec::new(),
        size: 0,
        node_id: None,
        node_type: None,
    }
}
