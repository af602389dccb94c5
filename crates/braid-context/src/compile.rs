//! Active-context compilation.
//!
//! Takes the node records of a thread plus the ordered active-id list and
//! renders the prompt text. Parents whose parts are active are dropped from
//! the rendering so the same content never appears twice; the explain block
//! records which parent/child relations caused each exclusion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use braid_core::{char_prefix, edge_types, ordered_unique, EdgeView, NodeView};

/// Where a parent/child relation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentSource {
    #[serde(rename = "payload.parent_id")]
    PayloadParentId,
    #[serde(rename = "edge.HAS_PART")]
    EdgeHasPart,
}

/// One parent/child relation with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub child_id: String,
    pub source: ParentSource,
}

/// Bookkeeping emitted alongside the compiled text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileExplain {
    /// Active ids after normalization, restricted to known nodes.
    pub active_input_ids: Vec<String>,
    pub active_input_count: usize,
    /// Active parents dropped because at least one part is active.
    pub excluded_parent_ids: Vec<String>,
    pub kept_node_ids: Vec<String>,
    pub kept_node_count: usize,
    /// Parent id to sorted child ids, both sides active.
    pub parent_to_children: BTreeMap<String, Vec<String>>,
    /// Parent id to relation records in discovery order.
    pub parent_sources: BTreeMap<String, Vec<ParentLink>>,
}

/// Compiled context text plus its explain block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledContext {
    pub text: String,
    pub explain: CompileExplain,
}

/// Renders the active nodes of a thread into prompt text.
///
/// Active ids are deduplicated, unknown ids are dropped, and an active
/// parent is excluded whenever one of its active children claims it via a
/// `parent_id` payload field or a `HAS_PART` edge. Kept nodes render in
/// active order as a header line and the node text, joined by blank lines.
pub fn compile_active_context(
    records: &[NodeView],
    active_ids: &[String],
    edges: &[EdgeView],
) -> CompiledContext {
    let by_id: HashMap<&str, &NodeView> = records
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| (r.id.as_str(), r))
        .collect();
    let ordered_ids: Vec<String> = ordered_unique(active_ids)
        .into_iter()
        .filter(|id| by_id.contains_key(id.as_str()))
        .collect();
    let active_set: HashSet<&str> = ordered_ids.iter().map(|s| s.as_str()).collect();

    let mut parent_to_children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut parent_sources: BTreeMap<String, Vec<ParentLink>> = BTreeMap::new();
    let mut link = |parent: &str, child: &str, source: ParentSource| {
        parent_to_children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
        parent_sources
            .entry(parent.to_string())
            .or_default()
            .push(ParentLink {
                child_id: child.to_string(),
                source,
            });
    };

    for id in &ordered_ids {
        let Some(record) = by_id.get(id.as_str()) else {
            continue;
        };
        let Some(parent_id) = record.meta.parent_id() else {
            continue;
        };
        if parent_id.is_empty() || !active_set.contains(parent_id) {
            continue;
        }
        link(parent_id, id, ParentSource::PayloadParentId);
    }

    for edge in edges {
        if edge.kind != edge_types::HAS_PART {
            continue;
        }
        if edge.from_id.is_empty() || edge.to_id.is_empty() {
            continue;
        }
        if active_set.contains(edge.from_id.as_str()) && active_set.contains(edge.to_id.as_str()) {
            link(&edge.from_id, &edge.to_id, ParentSource::EdgeHasPart);
        }
    }

    let excluded: Vec<String> = ordered_ids
        .iter()
        .filter(|id| parent_to_children.contains_key(*id))
        .cloned()
        .collect();
    let excluded_set: HashSet<&str> = excluded.iter().map(|s| s.as_str()).collect();

    let kept: Vec<&NodeView> = ordered_ids
        .iter()
        .filter(|id| !excluded_set.contains(id.as_str()))
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .collect();

    let mut blocks: Vec<String> = Vec::with_capacity(kept.len());
    for record in &kept {
        let kind = if record.kind.is_empty() {
            "Node"
        } else {
            record.kind.as_str()
        };
        let head = format!(
            "[{} {} @ {}]",
            kind,
            char_prefix(&record.id, 6),
            record.created_at.to_rfc3339()
        );
        let body = record.text_or_empty();
        let block = match kind {
            "Message" => format!("{} role={}\n{}", head, record.meta.role().unwrap_or("?"), body),
            "Fold" => format!(
                "{} title={}\n{}",
                head,
                record.meta.title().unwrap_or("Fold"),
                body
            ),
            _ => format!("{}\n{}", head, body),
        };
        blocks.push(block);
    }
    let text = blocks.join("\n\n").trim().to_string();

    let explain = CompileExplain {
        active_input_count: ordered_ids.len(),
        active_input_ids: ordered_ids,
        excluded_parent_ids: excluded,
        kept_node_ids: kept.iter().map(|r| r.id.clone()).collect(),
        kept_node_count: kept.len(),
        parent_to_children: parent_to_children
            .into_iter()
            .map(|(parent, children)| (parent, children.into_iter().collect()))
            .collect(),
        parent_sources,
    };

    debug!(
        active = explain.active_input_count,
        kept = explain.kept_node_count,
        excluded = explain.excluded_parent_ids.len(),
        "context compiled"
    );

    CompiledContext { text, explain }
}
