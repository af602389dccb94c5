//! Clustering input items.
//!
//! Before any splitting happens the selected nodes are folded into a flat
//! item list: structural groups first (fold members and split parts whose
//! parent sits outside the selection), then plain leaves for whatever is
//! left. Each structural child belongs to at most one group, the first
//! group in `(edge type, parent id)` order wins.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use braid_core::{char_prefix, edge_types, ordered_unique, EdgeView, NodeView};
use braid_embed::mean_unit;

use crate::tree::ClusterKind;

/// Snippet length cap in characters.
const SNIPPET_MAX_CHARS: usize = 56;

/// One clustering input: a single node or a pre-made structural group.
#[derive(Debug, Clone)]
pub(crate) struct ClusterItem {
    /// `(created_at, id)` ordering key. A group sorts under its own
    /// `struct:` id with its earliest member's timestamp.
    pub sort_key: (DateTime<Utc>, String),
    /// Unit centroid, None when no member carries a vector.
    pub centroid: Option<Vec<f32>>,
    /// Graph node ids covered, in display order.
    pub leaf_ids: Vec<String>,
    pub payload: ItemPayload,
}

#[derive(Debug, Clone)]
pub(crate) enum ItemPayload {
    Leaf {
        node_id: String,
        node_type: String,
        snippet: String,
    },
    Group {
        group_id: String,
        kind: ClusterKind,
        label: String,
        children: Vec<ClusterItem>,
    },
}

/// Whitespace-collapsed text clipped to `max_chars` characters.
pub(crate) fn compact(text: &str, max_chars: usize) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.chars().count() <= max_chars {
        return joined;
    }
    let head: String = joined.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Display snippet for one node: a resource's name when set, otherwise its
/// compacted text, falling back to kind and id.
pub(crate) fn node_snippet(node: &NodeView) -> String {
    if let Some(name) = node.meta.resource_name() {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    let text = node.text_or_empty();
    let source = if !text.is_empty() {
        text
    } else if !node.kind.is_empty() {
        node.kind.as_str()
    } else {
        node.id.as_str()
    };
    compact(source, SNIPPET_MAX_CHARS)
}

fn leaf_item(node: &NodeView, vectors: &HashMap<String, Vec<f32>>) -> ClusterItem {
    ClusterItem {
        sort_key: (node.created_at, node.id.clone()),
        centroid: vectors.get(node.id.as_str()).cloned(),
        leaf_ids: vec![node.id.clone()],
        payload: ItemPayload::Leaf {
            node_id: node.id.clone(),
            node_type: node.kind.clone(),
            snippet: node_snippet(node),
        },
    }
}

/// Folds the selection into clustering items. Returns the items plus the
/// number of structural groups formed.
pub(crate) fn collect_items(
    nodes: &[&NodeView],
    edges: &[EdgeView],
    vectors: &HashMap<String, Vec<f32>>,
) -> (Vec<ClusterItem>, usize) {
    let by_id: HashMap<&str, &NodeView> = nodes.iter().map(|n| (n.id.as_str(), *n)).collect();

    // Candidate groups: fold members and split parts whose parent node is
    // not part of the selection itself.
    let mut grouped: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for edge in edges {
        if edge.kind != edge_types::HAS_PART && edge.kind != edge_types::FOLDS {
            continue;
        }
        if edge.from_id.is_empty() || edge.to_id.is_empty() {
            continue;
        }
        if by_id.contains_key(edge.from_id.as_str()) || !by_id.contains_key(edge.to_id.as_str()) {
            continue;
        }
        grouped
            .entry((edge.kind.clone(), edge.from_id.clone()))
            .or_default()
            .push(edge.to_id.clone());
    }

    let mut consumed: HashSet<String> = HashSet::new();
    let mut items: Vec<ClusterItem> = Vec::new();
    let mut group_count = 0usize;

    for ((etype, parent_id), raw_children) in grouped {
        let mut members: Vec<&NodeView> = ordered_unique(&raw_children)
            .into_iter()
            .filter(|id| !consumed.contains(id))
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect();
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        consumed.extend(members.iter().map(|n| n.id.clone()));

        let children: Vec<ClusterItem> = members.iter().map(|n| leaf_item(n, vectors)).collect();
        let member_vectors: Vec<&[f32]> = children
            .iter()
            .filter_map(|c| c.centroid.as_deref())
            .collect();
        let dim = member_vectors.first().map_or(0, |v| v.len());

        let (kind, label) = if etype == edge_types::FOLDS {
            (
                ClusterKind::StructuralFold,
                format!("Unfolded Fold · {}", char_prefix(&parent_id, 6)),
            )
        } else {
            (
                ClusterKind::StructuralSplit,
                format!("Split Parts · {}", char_prefix(&parent_id, 6)),
            )
        };

        group_count += 1;
        let group_id = format!("struct:{}:{}", etype, parent_id);
        items.push(ClusterItem {
            sort_key: (members[0].created_at, group_id.clone()),
            centroid: mean_unit(&member_vectors, dim),
            leaf_ids: members.iter().map(|n| n.id.clone()).collect(),
            payload: ItemPayload::Group {
                group_id,
                kind,
                label,
                children,
            },
        });
    }

    let mut rest: Vec<&NodeView> = nodes
        .iter()
        .copied()
        .filter(|n| !consumed.contains(n.id.as_str()))
        .collect();
    rest.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    items.extend(rest.iter().map(|n| leaf_item(n, vectors)));

    debug!(
        items = items.len(),
        groups = group_count,
        "clustering items collected"
    );

    (items, group_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::NodeMeta;
    use chrono::TimeZone;

    fn node(id: &str, kind: &str, text: &str, secs: i64) -> NodeView {
        NodeView::new(id, kind, Utc.timestamp_opt(secs, 0).unwrap()).with_text(text)
    }

    fn refs(nodes: &[NodeView]) -> Vec<&NodeView> {
        nodes.iter().collect()
    }

    #[test]
    fn test_compact_collapses_whitespace_and_clips() {
        assert_eq!(compact("a   b\n\tc", 56), "a b c");
        let long = "word ".repeat(30);
        let clipped = compact(&long, 56);
        assert_eq!(clipped.chars().count(), 56);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn test_snippet_prefers_resource_name() {
        let plain = node("r1", "Resource", "body text", 0);
        assert_eq!(node_snippet(&plain), "body text");
        let named = plain.with_meta(NodeMeta::Resource {
            name: Some("  report.pdf  ".to_string()),
        });
        assert_eq!(node_snippet(&named), "report.pdf");
    }

    #[test]
    fn test_snippet_falls_back_to_kind_then_id() {
        assert_eq!(node_snippet(&node("m1", "Message", "", 0)), "Message");
        assert_eq!(node_snippet(&node("m1", "", "", 0)), "m1");
    }

    #[test]
    fn test_collect_groups_fold_members() {
        let nodes = vec![
            node("m1", "Message", "first", 1),
            node("m2", "Message", "second", 2),
            node("m3", "Message", "third", 3),
        ];
        // The fold node itself is outside the selection.
        let edges = vec![
            EdgeView::new("fold-1", "m2", edge_types::FOLDS),
            EdgeView::new("fold-1", "m1", edge_types::FOLDS),
        ];
        let (items, groups) = collect_items(&refs(&nodes), &edges, &HashMap::new());
        assert_eq!(groups, 1);
        assert_eq!(items.len(), 2);
        let ItemPayload::Group {
            group_id,
            kind,
            label,
            children,
        } = &items[0].payload
        else {
            panic!("expected group item first");
        };
        assert_eq!(group_id, "struct:FOLDS:fold-1");
        assert_eq!(*kind, ClusterKind::StructuralFold);
        assert_eq!(label, "Unfolded Fold · fold-1");
        assert_eq!(children.len(), 2);
        assert_eq!(items[0].leaf_ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_group_sorts_under_its_own_id() {
        let nodes = vec![node("m1", "Message", "first", 5), node("m2", "Message", "second", 6)];
        let edges = vec![
            EdgeView::new("fold-2", "m1", edge_types::FOLDS),
            EdgeView::new("fold-2", "m2", edge_types::FOLDS),
        ];
        let (items, _) = collect_items(&refs(&nodes), &edges, &HashMap::new());
        // Earliest member's timestamp, but the group's synthesized id.
        assert_eq!(
            items[0].sort_key,
            (
                Utc.timestamp_opt(5, 0).unwrap(),
                "struct:FOLDS:fold-2".to_string()
            )
        );
    }

    #[test]
    fn test_collect_skips_group_when_parent_selected() {
        let nodes = vec![
            node("parent", "Resource", "whole", 0),
            node("p1", "Part", "one", 1),
            node("p2", "Part", "two", 2),
        ];
        let edges = vec![
            EdgeView::new("parent", "p1", edge_types::HAS_PART),
            EdgeView::new("parent", "p2", edge_types::HAS_PART),
        ];
        let (items, groups) = collect_items(&refs(&nodes), &edges, &HashMap::new());
        assert_eq!(groups, 0);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_collect_first_group_claims_shared_child() {
        let nodes = vec![
            node("a", "Message", "a", 1),
            node("b", "Message", "b", 2),
            node("c", "Message", "c", 3),
        ];
        let edges = vec![
            EdgeView::new("split-1", "b", edge_types::HAS_PART),
            EdgeView::new("split-1", "c", edge_types::HAS_PART),
            EdgeView::new("fold-1", "a", edge_types::FOLDS),
            EdgeView::new("fold-1", "b", edge_types::FOLDS),
        ];
        // FOLDS sorts before HAS_PART, so the fold claims b first and the
        // split group collapses below two members.
        let (items, groups) = collect_items(&refs(&nodes), &edges, &HashMap::new());
        assert_eq!(groups, 1);
        let all_leaves: Vec<&str> = items
            .iter()
            .flat_map(|it| it.leaf_ids.iter().map(|s| s.as_str()))
            .collect();
        assert_eq!(all_leaves, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_group_centroid_is_member_mean() {
        let nodes = vec![node("a", "Message", "a", 1), node("b", "Message", "b", 2)];
        let edges = vec![
            EdgeView::new("fold-1", "a", edge_types::FOLDS),
            EdgeView::new("fold-1", "b", edge_types::FOLDS),
        ];
        let mut vectors = HashMap::new();
        vectors.insert("a".to_string(), vec![1.0, 0.0]);
        vectors.insert("b".to_string(), vec![0.0, 1.0]);
        let (items, _) = collect_items(&refs(&nodes), &edges, &vectors);
        let centroid = items[0].centroid.as_ref().unwrap();
        assert!((centroid[0] - centroid[1]).abs() < 1e-6);
    }
}
