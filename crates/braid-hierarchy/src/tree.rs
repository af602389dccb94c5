//! Preview tree types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind discriminator for preview tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    /// The single top-level node.
    Root,
    /// A derived topic cluster.
    Cluster,
    /// One graph node.
    Leaf,
    /// Members of a fold whose fold node is outside the selection.
    StructuralFold,
    /// Parts of a split node whose parent is outside the selection.
    StructuralSplit,
}

/// One node of the preview tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: String,
    pub kind: ClusterKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClusterNode>,
    /// Graph node ids covered by this subtree, in display order.
    pub leaf_node_ids: Vec<String>,
    pub size: usize,
    /// Set on leaves only: the graph node this leaf stands for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

/// Flattened placement of one graph node within the preview tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafPlacement {
    pub node_id: String,
    /// Zero-based depth-first visit order.
    pub rank: usize,
    pub depth: usize,
    /// Ancestor cluster ids from the root down to the leaf's parent.
    pub cluster_path: Vec<String>,
}

/// Summary counters for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub selected_nodes: usize,
    pub clustered_nodes: usize,
    /// Effective leaf capacity after clamping.
    pub max_leaf_size: usize,
    pub top_groups: usize,
}

/// Full result of one hierarchy build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyPreview {
    pub tree: ClusterNode,
    pub leaf_placements: Vec<LeafPlacement>,
    /// Graph node id to its depth in the tree.
    pub node_depths: BTreeMap<String, usize>,
    pub stats: HierarchyStats,
}
