//! Depth-first layout of the preview tree.

use std::collections::BTreeMap;

use crate::tree::{ClusterKind, ClusterNode, LeafPlacement};

/// Flattens the tree into leaf placements plus a node-id to depth map.
pub(crate) fn layout_leaves(
    root: &ClusterNode,
) -> (Vec<LeafPlacement>, BTreeMap<String, usize>) {
    let mut placements = Vec::new();
    let mut path: Vec<String> = Vec::new();
    walk(root, &mut path, &mut placements);

    let depths = placements
        .iter()
        .map(|p| (p.node_id.clone(), p.depth))
        .collect();
    (placements, depths)
}

fn walk(node: &ClusterNode, path: &mut Vec<String>, placements: &mut Vec<LeafPlacement>) {
    if node.kind == ClusterKind::Leaf {
        if let Some(node_id) = &node.node_id {
            placements.push(LeafPlacement {
                node_id: node_id.clone(),
                rank: placements.len(),
                depth: path.len(),
                cluster_path: path.clone(),
            });
        }
        return;
    }
    let enters_path = !node.id.is_empty() && !node.id.starts_with("leaf:");
    if enters_path {
        path.push(node.id.clone());
    }
    for child in &node.children {
        walk(child, path, placements);
    }
    if enters_path {
        path.pop();
    }
}
