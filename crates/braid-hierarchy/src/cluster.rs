//! Recursive bisecting build of the preview tree.
//!
//! Items are split with a two-seed cosine bisection. Every choice in here
//! breaks ties over the `(created_at, id)` sort key so rebuilding from the
//! same snapshot reproduces the same tree.

use std::collections::HashMap;

use braid_core::NodeView;
use braid_embed::{dot, mean_unit};

use crate::item::{node_snippet, ClusterItem, ItemPayload};
use crate::tree::{ClusterKind, ClusterNode};

/// Leaf capacity used when a split is impossible and the level must close.
const FORCED_TERMINAL_CAP: usize = usize::MAX;

pub(crate) struct BuildCtx<'a> {
    pub nodes_by_id: HashMap<&'a str, &'a NodeView>,
}

/// Builds the subtree for `items`. `counter` is shared across the whole
/// build and makes generated cluster ids unique; split branches reserve a
/// value per side and terminal levels read it without advancing.
pub(crate) fn build_tree(
    mut items: Vec<ClusterItem>,
    depth: usize,
    counter: &mut u64,
    max_leaf_size: usize,
    ctx: &BuildCtx<'_>,
) -> ClusterNode {
    items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    let total_leaves: usize = items.iter().map(|it| it.leaf_ids.len()).sum();
    let prefix = if depth > 0 { "Topic" } else { "Hierarchy" };

    if total_leaves <= max_leaf_size || items.len() <= 2 {
        let label = cluster_label(&items, prefix, ctx);
        let leaf_node_ids: Vec<String> = items
            .iter()
            .flat_map(|it| it.leaf_ids.iter().cloned())
            .collect();

        let mut children = Vec::with_capacity(items.len());
        for ClusterItem {
            leaf_ids, payload, ..
        } in items
        {
            match payload {
                ItemPayload::Leaf {
                    node_id,
                    node_type,
                    snippet,
                } => {
                    children.push(ClusterNode {
                        id: format!("leaf:{}", node_id),
                        kind: ClusterKind::Leaf,
                        label: if snippet.is_empty() {
                            node_type.clone()
                        } else {
                            snippet
                        },
                        children: Vec::new(),
                        leaf_node_ids: vec![node_id.clone()],
                        size: 1,
                        node_id: Some(node_id),
                        node_type: Some(node_type),
                    });
                }
                ItemPayload::Group {
                    group_id,
                    kind,
                    label,
                    children: group_children,
                } => {
                    let mut sub = build_tree(
                        group_children,
                        depth + 1,
                        counter,
                        usize::max(2, max_leaf_size.saturating_sub(1)),
                        ctx,
                    );
                    sub.id = group_id;
                    sub.kind = kind;
                    sub.label = label;
                    sub.size = leaf_ids.len();
                    sub.leaf_node_ids = leaf_ids;
                    children.push(sub);
                }
            }
        }

        return ClusterNode {
            id: format!("cluster:{}:{}", depth, counter),
            kind: if depth > 0 {
                ClusterKind::Cluster
            } else {
                ClusterKind::Root
            },
            label,
            children,
            size: leaf_node_ids.len(),
            leaf_node_ids,
            node_id: None,
            node_type: None,
        };
    }

    let Some((left_idx, right_idx)) = partition_bisect(&items) else {
        return build_tree(items, depth, counter, FORCED_TERMINAL_CAP, ctx);
    };

    let label = cluster_label(&items, prefix, ctx);
    let (left_items, right_items) = split_off(items, &left_idx, &right_idx);

    *counter += 1;
    let left = build_tree(left_items, depth + 1, counter, max_leaf_size, ctx);
    *counter += 1;
    let right = build_tree(right_items, depth + 1, counter, max_leaf_size, ctx);

    let mut children = vec![left, right];
    children.sort_by(|a, b| sibling_key(a).cmp(&sibling_key(b)));

    let leaf_node_ids: Vec<String> = children
        .iter()
        .flat_map(|c| c.leaf_node_ids.iter().cloned())
        .collect();

    ClusterNode {
        id: format!("cluster:{}:{}", depth, counter),
        kind: if depth > 0 {
            ClusterKind::Cluster
        } else {
            ClusterKind::Root
        },
        label,
        children,
        size: leaf_node_ids.len(),
        leaf_node_ids,
        node_id: None,
        node_type: None,
    }
}

/// Display order for split siblings: first child's label when present,
/// otherwise the node's own, with the id as tie-break.
fn sibling_key(node: &ClusterNode) -> (String, String) {
    let label = node
        .children
        .first()
        .map(|c| c.label.clone())
        .unwrap_or_else(|| node.label.clone());
    (label, node.id.clone())
}

fn split_off(
    items: Vec<ClusterItem>,
    left_idx: &[usize],
    right_idx: &[usize],
) -> (Vec<ClusterItem>, Vec<ClusterItem>) {
    let mut left = Vec::with_capacity(left_idx.len());
    let mut right = Vec::with_capacity(right_idx.len());
    let in_left: Vec<bool> = {
        let mut flags = vec![false; items.len()];
        for &i in left_idx {
            flags[i] = true;
        }
        flags
    };
    for (i, item) in items.into_iter().enumerate() {
        if in_left[i] {
            left.push(item);
        } else {
            right.push(item);
        }
    }
    (left, right)
}

/// Two-seed bisection over the (already sorted) item list.
///
/// Seeds: the earliest vectorized item, the item farthest from it, then the
/// item farthest from that one. Items side with the closer seed; items
/// without vectors go to the smaller side. Falls back to a positional
/// midpoint split when vectors are missing or indistinguishable, and to
/// None (caller closes the level) when there are fewer than four items.
pub(crate) fn partition_bisect(items: &[ClusterItem]) -> Option<(Vec<usize>, Vec<usize>)> {
    if items.len() < 4 {
        return None;
    }

    let mut vectorized: Vec<(usize, &[f32])> = items
        .iter()
        .enumerate()
        .filter_map(|(i, it)| it.centroid.as_deref().map(|v| (i, v)))
        .collect();
    if vectorized.len() < 2 {
        return midpoint_split(items.len());
    }
    vectorized.sort_by(|(x, _), (y, _)| items[*x].sort_key.cmp(&items[*y].sort_key));

    let (seed_a, a_vec) = vectorized[0];
    let far_from = |anchor: &[f32], pool: &[(usize, &[f32])]| -> Option<(usize, Vec<f32>)> {
        pool.iter()
            .max_by(|(xi, xv), (yi, yv)| {
                let dx = 1.0 - dot(anchor, xv);
                let dy = 1.0 - dot(anchor, yv);
                dx.total_cmp(&dy)
                    .then_with(|| items[*xi].sort_key.cmp(&items[*yi].sort_key))
            })
            .map(|(i, v)| (*i, v.to_vec()))
    };
    let (_, b_vec) = far_from(a_vec, &vectorized[1..])?;
    let (_, c_vec) = far_from(&b_vec, &vectorized)?;

    let indistinct = b_vec.len() == c_vec.len()
        && b_vec
            .iter()
            .zip(&c_vec)
            .all(|(b, c)| (b - c).abs() <= 1e-8 + 1e-5 * c.abs());
    if indistinct {
        return midpoint_split(items.len());
    }

    let mut left: Vec<usize> = Vec::new();
    let mut right: Vec<usize> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.centroid.as_deref() {
            None => {
                if left.len() <= right.len() {
                    left.push(i);
                } else {
                    right.push(i);
                }
            }
            Some(v) => {
                let to_b = dot(v, &b_vec);
                let to_c = dot(v, &c_vec);
                if to_b > to_c {
                    left.push(i);
                } else if to_c > to_b {
                    right.push(i);
                } else if item.sort_key <= items[seed_a].sort_key {
                    left.push(i);
                } else {
                    right.push(i);
                }
            }
        }
    }
    if left.is_empty() || right.is_empty() {
        return midpoint_split(items.len());
    }
    Some((left, right))
}

fn midpoint_split(len: usize) -> Option<(Vec<usize>, Vec<usize>)> {
    if len < 2 {
        return None;
    }
    let mid = len / 2;
    Some(((0..mid).collect(), (mid..len).collect()))
}

/// Label for a cluster level: the snippet of the leaf closest to the level
/// centroid, or a member count when no vectors are available.
pub(crate) fn cluster_label(items: &[ClusterItem], prefix: &str, ctx: &BuildCtx<'_>) -> String {
    let total_leaves: usize = items.iter().map(|it| it.leaf_ids.len()).sum();
    let centroids: Vec<&[f32]> = items.iter().filter_map(|it| it.centroid.as_deref()).collect();
    let dim = centroids.first().map_or(0, |v| v.len());
    let Some(center) = mean_unit(&centroids, dim) else {
        return format!("{} ({})", prefix, total_leaves);
    };

    let mut best_score = f32::NEG_INFINITY;
    let mut best_id: Option<&str> = None;
    for item in items {
        let score = match item.centroid.as_deref() {
            Some(v) => dot(&center, v),
            None => -1.0,
        };
        for nid in &item.leaf_ids {
            let replace = score > best_score
                || ((score - best_score).abs() < 1e-9
                    && best_id.is_some_and(|cur| nid.as_str() < cur));
            if replace {
                best_score = score;
                best_id = Some(nid);
            }
        }
    }

    match best_id.and_then(|id| ctx.nodes_by_id.get(id)) {
        Some(node) => format!("{} · {}", prefix, node_snippet(node)),
        None => format!("{} ({})", prefix, total_leaves),
    }
}
