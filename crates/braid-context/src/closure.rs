//! Bounded closure expansion over typed edges.
//!
//! Expansion is a breadth-first walk from a list of seed nodes across a
//! caller-supplied set of edge types, optionally capped at a maximum number
//! of visited nodes. The result is deterministic for a given input: seeds
//! keep their given order and every newly reached node is appended in
//! lexicographic id order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;

use braid_core::{edge_types, ordered_unique, Direction, EdgeView};

/// Upper bound on recorded trace entries per expansion.
const EDGE_TRACE_CAP: usize = 200;

/// One traversed edge, recorded in stored orientation.
///
/// `dir` says how the walk crossed the edge: `out` means it moved from
/// `from` to `to`, `in` means it moved from `to` back to `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTraceEntry {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub dir: Direction,
}

/// Outcome of one closure expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureResult {
    /// Seeds in input order followed by newly visited ids, sorted.
    pub ordered_ids: Vec<String>,
    /// Seeds after dropping empties and duplicates.
    pub seed_ids: Vec<String>,
    /// Visited ids that were not seeds, sorted.
    pub closure_added_ids: Vec<String>,
    /// Every traversed edge, counting past the trace cap.
    pub visited_edge_count: usize,
    /// True when `max_nodes` stopped the walk early.
    pub truncated: bool,
    pub max_nodes: Option<usize>,
    /// Edge types the walk was allowed to follow, sorted.
    pub allowed_types: Vec<String>,
    pub direction: Direction,
    /// First traversed edges, capped at 200 entries.
    pub edge_trace: Vec<EdgeTraceEntry>,
}

struct Walk {
    visited: HashSet<String>,
    queue: VecDeque<String>,
    trace: Vec<EdgeTraceEntry>,
    traversed: usize,
    truncated: bool,
    max_nodes: Option<usize>,
}

impl Walk {
    /// Offers `dst`, reached over the stored edge `(from, to, kind)`.
    /// Returns false once the node cap refuses a new node, which ends
    /// the whole walk.
    fn offer(&mut self, from: &str, to: &str, kind: &str, dst: &str, dir: Direction) -> bool {
        if let Some(cap) = self.max_nodes {
            if self.visited.len() >= cap && !self.visited.contains(dst) {
                self.truncated = true;
                return false;
            }
        }
        self.traversed += 1;
        if self.trace.len() < EDGE_TRACE_CAP {
            self.trace.push(EdgeTraceEntry {
                from: from.to_string(),
                to: to.to_string(),
                kind: kind.to_string(),
                dir,
            });
        }
        if !self.visited.contains(dst) {
            self.visited.insert(dst.to_string());
            self.queue.push_back(dst.to_string());
        }
        true
    }
}

/// Expands the closure of `seed_ids` over `edges`, following only the
/// `allowed_types` edge kinds in the given `direction`.
///
/// Empty seeds or an empty type set short-circuit to a no-op result that
/// carries the seeds through unchanged.
pub fn expand_closure(
    seed_ids: &[String],
    edges: &[EdgeView],
    allowed_types: &[String],
    max_nodes: Option<usize>,
    direction: Direction,
) -> ClosureResult {
    let allowed: BTreeSet<&str> = allowed_types
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    let seeds = ordered_unique(seed_ids);

    if seeds.is_empty() || allowed.is_empty() {
        return ClosureResult {
            ordered_ids: seeds.clone(),
            seed_ids: seeds,
            closure_added_ids: Vec::new(),
            visited_edge_count: 0,
            truncated: false,
            max_nodes,
            allowed_types: allowed.iter().map(|t| t.to_string()).collect(),
            direction,
            edge_trace: Vec::new(),
        };
    }

    // Adjacency restricted to the allowed types, sorted by (neighbor, type)
    // so the walk visits neighbors in a stable order.
    let mut out_adj: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    let mut in_adj: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for edge in edges {
        if !allowed.contains(edge.kind.as_str()) {
            continue;
        }
        if edge.from_id.is_empty() || edge.to_id.is_empty() {
            continue;
        }
        out_adj
            .entry(edge.from_id.as_str())
            .or_default()
            .push((edge.to_id.as_str(), edge.kind.as_str()));
        in_adj
            .entry(edge.to_id.as_str())
            .or_default()
            .push((edge.from_id.as_str(), edge.kind.as_str()));
    }
    for list in out_adj.values_mut().chain(in_adj.values_mut()) {
        list.sort();
    }

    let mut walk = Walk {
        visited: seeds.iter().cloned().collect(),
        queue: seeds.iter().cloned().collect(),
        trace: Vec::new(),
        traversed: 0,
        truncated: false,
        max_nodes,
    };

    'bfs: while let Some(cur) = walk.queue.pop_front() {
        if direction.follows_out() {
            if let Some(nexts) = out_adj.get(cur.as_str()) {
                for (nxt, kind) in nexts {
                    if !walk.offer(&cur, nxt, kind, nxt, Direction::Out) {
                        break 'bfs;
                    }
                }
            }
        }
        if direction.follows_in() {
            if let Some(prevs) = in_adj.get(cur.as_str()) {
                for (prv, kind) in prevs {
                    if !walk.offer(prv, &cur, kind, prv, Direction::In) {
                        break 'bfs;
                    }
                }
            }
        }
    }

    let seed_set: HashSet<&str> = seeds.iter().map(|s| s.as_str()).collect();
    let mut added: Vec<String> = walk
        .visited
        .iter()
        .filter(|id| !seed_set.contains(id.as_str()))
        .cloned()
        .collect();
    added.sort();

    let mut ordered_ids = seeds.clone();
    ordered_ids.extend(added.iter().cloned());

    debug!(
        seeds = seeds.len(),
        visited = walk.visited.len(),
        edges = walk.traversed,
        truncated = walk.truncated,
        "closure expanded"
    );

    ClosureResult {
        ordered_ids,
        seed_ids: seeds,
        closure_added_ids: added,
        visited_edge_count: walk.traversed,
        truncated: walk.truncated,
        max_nodes,
        allowed_types: allowed.iter().map(|t| t.to_string()).collect(),
        direction,
        edge_trace: walk.trace,
    }
}

/// Member ids of a fold: targets of its `FOLDS` edges, deduplicated,
/// in input edge order.
pub fn fold_members(edges: &[EdgeView], fold_id: &str) -> Vec<String> {
    ordered_unique(
        edges
            .iter()
            .filter(|e| e.kind == edge_types::FOLDS && e.from_id == fold_id)
            .map(|e| e.to_id.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn edge(from: &str, to: &str, kind: &str) -> EdgeView {
        EdgeView::new(from, to, kind)
    }

    #[test]
    fn test_expand_follows_only_allowed_types() {
        let edges = vec![
            edge("a", "b", edge_types::DEPENDS),
            edge("b", "c", edge_types::DEPENDS),
            edge("a", "x", edge_types::REPLY_TO),
        ];
        let result = expand_closure(
            &ids(&["a"]),
            &edges,
            &ids(&[edge_types::DEPENDS]),
            None,
            Direction::Out,
        );
        assert_eq!(result.ordered_ids, ids(&["a", "b", "c"]));
        assert_eq!(result.closure_added_ids, ids(&["b", "c"]));
        assert_eq!(result.visited_edge_count, 2);
        assert!(!result.truncated);
    }

    #[test]
    fn test_expand_seeds_keep_order_added_sorted() {
        let edges = vec![
            edge("s2", "zz", edge_types::DEPENDS),
            edge("s1", "aa", edge_types::DEPENDS),
        ];
        let result = expand_closure(
            &ids(&["s2", "s1", "s2"]),
            &edges,
            &ids(&[edge_types::DEPENDS]),
            None,
            Direction::Out,
        );
        assert_eq!(result.seed_ids, ids(&["s2", "s1"]));
        assert_eq!(result.ordered_ids, ids(&["s2", "s1", "aa", "zz"]));
    }

    #[test]
    fn test_expand_node_cap_truncates() {
        let edges = vec![
            edge("a", "b", edge_types::DEPENDS),
            edge("a", "c", edge_types::DEPENDS),
            edge("a", "d", edge_types::DEPENDS),
        ];
        let result = expand_closure(
            &ids(&["a"]),
            &edges,
            &ids(&[edge_types::DEPENDS]),
            Some(2),
            Direction::Out,
        );
        assert!(result.truncated);
        assert_eq!(result.ordered_ids, ids(&["a", "b"]));
        assert_eq!(result.visited_edge_count, 1);
        assert_eq!(result.edge_trace.len(), 1);
    }

    #[test]
    fn test_expand_in_direction_reaches_sources() {
        let edges = vec![edge("a", "b", edge_types::DEPENDS)];
        let result = expand_closure(
            &ids(&["b"]),
            &edges,
            &ids(&[edge_types::DEPENDS]),
            None,
            Direction::In,
        );
        assert_eq!(result.ordered_ids, ids(&["b", "a"]));
        let entry = &result.edge_trace[0];
        assert_eq!(entry.from, "a");
        assert_eq!(entry.to, "b");
        assert_eq!(entry.dir, Direction::In);
    }

    #[test]
    fn test_expand_both_directions() {
        let edges = vec![
            edge("a", "b", edge_types::DEPENDS),
            edge("b", "c", edge_types::HAS_PART),
        ];
        let result = expand_closure(
            &ids(&["b"]),
            &edges,
            &ids(&[edge_types::DEPENDS, edge_types::HAS_PART]),
            None,
            Direction::Both,
        );
        assert_eq!(result.ordered_ids, ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_expand_empty_seeds_is_noop() {
        let edges = vec![edge("a", "b", edge_types::DEPENDS)];
        let result = expand_closure(
            &ids(&[]),
            &edges,
            &ids(&[edge_types::DEPENDS]),
            Some(5),
            Direction::Out,
        );
        assert!(result.ordered_ids.is_empty());
        assert_eq!(result.visited_edge_count, 0);
        assert!(!result.truncated);
        assert_eq!(result.max_nodes, Some(5));
    }

    #[test]
    fn test_expand_empty_types_is_noop() {
        let edges = vec![edge("a", "b", edge_types::DEPENDS)];
        let result = expand_closure(&ids(&["a"]), &edges, &[], None, Direction::Both);
        assert_eq!(result.ordered_ids, ids(&["a"]));
        assert!(result.edge_trace.is_empty());
    }

    #[test]
    fn test_expand_deterministic_under_edge_shuffle() {
        let forward = vec![
            edge("a", "c", edge_types::DEPENDS),
            edge("a", "b", edge_types::DEPENDS),
            edge("b", "d", edge_types::HAS_PART),
        ];
        let mut shuffled = forward.clone();
        shuffled.reverse();
        let types = ids(&[edge_types::DEPENDS, edge_types::HAS_PART]);
        let lhs = expand_closure(&ids(&["a"]), &forward, &types, None, Direction::Out);
        let rhs = expand_closure(&ids(&["a"]), &shuffled, &types, None, Direction::Out);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_expand_counts_revisits_without_truncating() {
        // b is visited once but offered twice; the second offer records an
        // edge without consuming cap room.
        let edges = vec![
            edge("a", "b", edge_types::DEPENDS),
            edge("a", "b", edge_types::REFERENCES),
        ];
        let types = ids(&[edge_types::DEPENDS, edge_types::REFERENCES]);
        let result = expand_closure(&ids(&["a"]), &edges, &types, Some(2), Direction::Out);
        assert!(!result.truncated);
        assert_eq!(result.visited_edge_count, 2);
        assert_eq!(result.ordered_ids, ids(&["a", "b"]));
    }

    #[test]
    fn test_expand_allowed_types_sorted_and_deduped() {
        let types = ids(&[edge_types::HAS_PART, edge_types::DEPENDS, edge_types::DEPENDS]);
        let result = expand_closure(&ids(&["a"]), &[], &types, None, Direction::Out);
        assert_eq!(
            result.allowed_types,
            ids(&[edge_types::DEPENDS, edge_types::HAS_PART])
        );
    }

    #[test]
    fn test_fold_members_order_and_dedupe() {
        let edges = vec![
            edge("f", "n2", edge_types::FOLDS),
            edge("f", "n1", edge_types::FOLDS),
            edge("f", "n2", edge_types::FOLDS),
            edge("g", "n3", edge_types::FOLDS),
            edge("f", "n4", edge_types::DEPENDS),
        ];
        assert_eq!(fold_members(&edges, "f"), ids(&["n2", "n1"]));
        assert_eq!(fold_members(&edges, "missing"), Vec::<String>::new());
    }
}
