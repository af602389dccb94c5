//! Integration tests for the context engine: closure expansion, compilation
//! and unfold planning working together over one thread snapshot.

use braid_context::{
    apply_unfold, compile_active_context, estimate_tokens, expand_closure, plan_unfold,
    ApplyOptions, PlanOptions,
};
use braid_core::{edge_types, Direction, EdgeView, NodeMeta, NodeView};
use chrono::{TimeZone, Utc};

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn node(id: &str, kind: &str, text: &str, secs: i64) -> NodeView {
    NodeView::new(id, kind, Utc.timestamp_opt(secs, 0).unwrap()).with_text(text)
}

/// A small research thread: two messages, a resource split into two parts,
/// and a dependency hanging off the second part.
fn research_thread() -> (Vec<NodeView>, Vec<EdgeView>) {
    let nodes = vec![
        node("msg-1", "Message", "let's review the crash report", 100).with_meta(
            NodeMeta::Message {
                role: Some("user".to_string()),
            },
        ),
        node("msg-2", "Message", "starting with the allocator logs", 200).with_meta(
            NodeMeta::Message {
                role: Some("assistant".to_string()),
            },
        ),
        node("res-1", "Resource", "full crash report body", 300),
        node("part-1", "Part", "crash report intro section", 310).with_meta(NodeMeta::Part {
            parent_id: "res-1".to_string(),
            chunk_index: 0,
            chunk_kind: None,
            origin_created_at: None,
        }),
        node("part-2", "Part", "allocator stack trace section", 320).with_meta(NodeMeta::Part {
            parent_id: "res-1".to_string(),
            chunk_index: 1,
            chunk_kind: None,
            origin_created_at: None,
        }),
        node("note-1", "Message", "allocator bug is in the arena pool", 400),
    ];
    let edges = vec![
        EdgeView::new("msg-1", "msg-2", edge_types::NEXT),
        EdgeView::new("res-1", "part-1", edge_types::HAS_PART),
        EdgeView::new("res-1", "part-2", edge_types::HAS_PART),
        EdgeView::new("note-1", "part-2", edge_types::DEPENDS),
    ];
    (nodes, edges)
}

/// Test closure expansion walks typed edges in both directions from a seed.
#[test]
fn test_closure_over_research_thread() {
    let (_, edges) = research_thread();
    let result = expand_closure(
        &ids(&["part-2"]),
        &edges,
        &ids(&[edge_types::HAS_PART, edge_types::DEPENDS]),
        None,
        Direction::Both,
    );
    // part-2 reaches its parent resource, the sibling part, and the note.
    assert_eq!(
        result.ordered_ids,
        ids(&["part-2", "note-1", "part-1", "res-1"])
    );
    assert!(!result.truncated);
}

/// Test compilation drops the resource once both parts are active.
#[test]
fn test_compile_excludes_split_resource() {
    let (nodes, edges) = research_thread();
    let active = ids(&["msg-1", "msg-2", "res-1", "part-1", "part-2"]);
    let compiled = compile_active_context(&nodes, &active, &edges);

    assert_eq!(compiled.explain.excluded_parent_ids, ids(&["res-1"]));
    assert_eq!(
        compiled.explain.kept_node_ids,
        ids(&["msg-1", "msg-2", "part-1", "part-2"])
    );
    assert!(!compiled.text.contains("full crash report body"));
    assert!(compiled.text.contains("crash report intro section"));
    assert!(compiled.text.contains("role=user"));
}

/// Test the planner recommends the relevant inactive node and apply then
/// activates its closure within budget.
#[test]
fn test_plan_then_apply_roundtrip() {
    let (nodes, edges) = research_thread();
    let active = ids(&["msg-1", "msg-2"]);

    let plan = plan_unfold(
        "allocator arena pool",
        &nodes,
        &edges,
        &active,
        &PlanOptions::default(),
    );
    assert!(plan
        .recommended_seed_ids
        .contains(&"note-1".to_string()));
    assert!(plan.recommended_cost_tokens <= plan.budget_tokens);

    let apply = apply_unfold(
        &plan.recommended_seed_ids,
        &nodes,
        &edges,
        &active,
        &ApplyOptions::default(),
    );
    assert!(apply.next_active_ids.contains(&"note-1".to_string()));
    assert_eq!(apply.next_active_ids[..2], ids(&["msg-1", "msg-2"])[..]);
    assert!(apply.used_tokens <= apply.budget_tokens);

    // Every recommended addition resolves to a known node.
    for id in &apply.added_ids {
        assert!(nodes.iter().any(|n| &n.id == id), "unknown added id {}", id);
    }
}

/// Test apply never exceeds its budget even when every seed is requested.
#[test]
fn test_apply_budget_is_hard_cap() {
    let (nodes, edges) = research_thread();
    let all_ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let options = ApplyOptions::default().with_budget_tokens(10);
    let result = apply_unfold(&all_ids, &nodes, &edges, &[], &options);

    assert!(result.used_tokens <= 10);
    let accepted_cost: usize = result
        .steps
        .iter()
        .filter(|s| s.accepted)
        .map(|s| s.candidate_cost_tokens)
        .sum();
    assert_eq!(result.used_tokens, accepted_cost);
    for step in result.steps.iter().filter(|s| !s.accepted) {
        assert!(
            result.used_tokens + step.candidate_cost_tokens > 10
                || step.candidate_cost_tokens > 10,
            "rejected step should not have fit when evaluated"
        );
    }
}

/// Test the full pipeline is deterministic across repeated runs.
#[test]
fn test_pipeline_deterministic() {
    let (nodes, edges) = research_thread();
    let active = ids(&["msg-1"]);

    let first = plan_unfold("allocator", &nodes, &edges, &active, &PlanOptions::default());
    let second = plan_unfold("allocator", &nodes, &edges, &active, &PlanOptions::default());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let compiled_a = compile_active_context(&nodes, &active, &edges);
    let compiled_b = compile_active_context(&nodes, &active, &edges);
    assert_eq!(compiled_a, compiled_b);
}

/// Test planned additions priced with the same estimator the caller sees.
#[test]
fn test_plan_costs_match_estimates() {
    let (nodes, edges) = research_thread();
    let plan = plan_unfold(
        "allocator stack trace",
        &nodes,
        &edges,
        &[],
        &PlanOptions::default(),
    );
    let expected: usize = plan
        .recommended_added_ids
        .iter()
        .map(|id| {
            let node = nodes.iter().find(|n| &n.id == id).unwrap();
            estimate_tokens(node.text_or_empty())
        })
        .sum();
    assert_eq!(plan.recommended_cost_tokens, expected);
}
