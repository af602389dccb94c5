//! Budgeted unfold planning.
//!
//! `plan_unfold` scores inactive nodes against a query, expands each
//! candidate's closure and greedily recommends seeds whose marginal token
//! cost fits the budget. `apply_unfold` replays a chosen seed list against
//! the same budget rule and returns the next active set.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use braid_core::{ordered_unique, Direction, EdgeView, NodeView, PlannerConfig};

use crate::closure::{expand_closure, ClosureResult};
use crate::lexical::{estimate_tokens, node_preview, round_to, score_text, tokenize_query};

/// Preview window width in characters.
const PREVIEW_MAX_CHARS: usize = 220;

/// Tuning knobs for `plan_unfold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Maximum number of recommended seeds.
    pub top_k: usize,
    /// Maximum number of ranked candidates kept in the result.
    pub max_candidates: usize,
    /// Token budget for recommended additions.
    pub budget_tokens: usize,
    pub closure_edge_types: Vec<String>,
    pub closure_direction: Direction,
    pub max_closure_nodes: Option<usize>,
}

impl PlanOptions {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            top_k: config.top_k,
            max_candidates: config.max_candidates,
            budget_tokens: config.budget_tokens,
            closure_edge_types: config.closure_edge_types.clone(),
            closure_direction: config.closure_direction,
            max_closure_nodes: config.max_closure_nodes,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_budget_tokens(mut self, budget_tokens: usize) -> Self {
        self.budget_tokens = budget_tokens;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_max_closure_nodes(mut self, max_closure_nodes: Option<usize>) -> Self {
        self.max_closure_nodes = max_closure_nodes;
        self
    }
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// Tuning knobs for `apply_unfold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOptions {
    pub budget_tokens: usize,
    pub closure_edge_types: Vec<String>,
    pub closure_direction: Direction,
    pub max_closure_nodes: Option<usize>,
}

impl ApplyOptions {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            budget_tokens: config.budget_tokens,
            closure_edge_types: config.closure_edge_types.clone(),
            closure_direction: config.closure_direction,
            max_closure_nodes: config.max_closure_nodes,
        }
    }

    pub fn with_budget_tokens(mut self, budget_tokens: usize) -> Self {
        self.budget_tokens = budget_tokens;
        self
    }
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// One ranked unfold candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfoldCandidate {
    pub seed_id: String,
    pub seed_type: String,
    pub score: f64,
    pub preview: String,
    /// Closure ids restricted to known nodes, seed first.
    pub closure_ids: Vec<String>,
    /// Closure ids other than the seed.
    pub closure_added_ids: Vec<String>,
    pub closure_size: usize,
    /// Estimated cost of closure ids not already active.
    pub marginal_cost_tokens: usize,
    /// score / max(1, marginal_cost_tokens), rounded to six decimals.
    pub marginal_ratio: f64,
    pub closure_explain: ClosureResult,
}

/// Outcome of `plan_unfold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub query: String,
    pub query_terms: Vec<String>,
    pub budget_tokens: usize,
    pub closure_edge_types: Vec<String>,
    pub closure_direction: Direction,
    pub max_closure_nodes: Option<usize>,
    pub candidates: Vec<UnfoldCandidate>,
    /// Accepted seeds in rank order.
    pub recommended_seed_ids: Vec<String>,
    /// Ids the recommendation would activate, in acceptance order.
    pub recommended_added_ids: Vec<String>,
    pub recommended_added_count: usize,
    pub recommended_cost_tokens: usize,
}

/// One seed evaluation inside `apply_unfold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyStep {
    pub seed_id: String,
    /// Ids this seed would activate, in closure order.
    pub candidate_add_ids: Vec<String>,
    pub candidate_cost_tokens: usize,
    pub accepted: bool,
    pub closure: ClosureResult,
}

/// Outcome of `apply_unfold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub next_active_ids: Vec<String>,
    /// Newly activated ids in append order.
    pub added_ids: Vec<String>,
    pub used_tokens: usize,
    pub budget_tokens: usize,
    pub closure_edge_types: Vec<String>,
    pub closure_direction: Direction,
    pub max_closure_nodes: Option<usize>,
    pub steps: Vec<ApplyStep>,
}

fn index_nodes(nodes: &[NodeView]) -> HashMap<&str, &NodeView> {
    nodes
        .iter()
        .filter(|n| !n.id.is_empty())
        .map(|n| (n.id.as_str(), n))
        .collect()
}

fn cost_of<'a, I>(ids: I, node_by_id: &HashMap<&str, &NodeView>) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    ids.into_iter()
        .filter_map(|id| node_by_id.get(id.as_str()))
        .map(|n| estimate_tokens(n.text_or_empty()))
        .sum()
}

/// Ranks inactive nodes against `query` and recommends a budget-fitting
/// subset of seeds.
///
/// Candidates are ordered by marginal ratio, then score, then lower cost.
/// The greedy pass walks that order, skips candidates whose un-selected
/// closure cost would overflow the budget and stops after `top_k` accepts.
/// A skip never ends the pass, a cheaper candidate may still fit.
pub fn plan_unfold(
    query: &str,
    nodes: &[NodeView],
    edges: &[EdgeView],
    active_ids: &[String],
    options: &PlanOptions,
) -> PlanResult {
    let query_terms = tokenize_query(query);
    let node_by_id = index_nodes(nodes);
    let active: HashSet<String> = ordered_unique(active_ids).into_iter().collect();

    let mut candidates: Vec<UnfoldCandidate> = Vec::new();
    for node in nodes {
        if node.id.is_empty() || active.contains(node.id.as_str()) {
            continue;
        }
        let score = score_text(&query_terms, node.text_or_empty());
        if score <= 0.0 {
            continue;
        }
        let closure = expand_closure(
            &[node.id.clone()],
            edges,
            &options.closure_edge_types,
            options.max_closure_nodes,
            options.closure_direction,
        );
        let closure_ids: Vec<String> = closure
            .ordered_ids
            .iter()
            .filter(|id| node_by_id.contains_key(id.as_str()))
            .cloned()
            .collect();
        let marginal_cost = cost_of(
            closure_ids.iter().filter(|id| !active.contains(id.as_str())),
            &node_by_id,
        );
        let seed_type = if node.kind.is_empty() {
            "Node".to_string()
        } else {
            node.kind.clone()
        };

        candidates.push(UnfoldCandidate {
            seed_id: node.id.clone(),
            seed_type,
            score,
            preview: node_preview(node.text_or_empty(), query, PREVIEW_MAX_CHARS),
            closure_added_ids: closure_ids
                .iter()
                .filter(|id| id.as_str() != node.id)
                .cloned()
                .collect(),
            closure_size: closure_ids.len(),
            marginal_cost_tokens: marginal_cost,
            marginal_ratio: round_to(score / usize::max(1, marginal_cost) as f64, 6),
            closure_ids,
            closure_explain: closure,
        });
    }

    candidates.sort_by(|a, b| {
        b.marginal_ratio
            .total_cmp(&a.marginal_ratio)
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.marginal_cost_tokens.cmp(&b.marginal_cost_tokens))
    });
    candidates.truncate(usize::max(1, options.max_candidates));

    let budget = usize::max(1, options.budget_tokens);
    let top_k = usize::max(1, options.top_k);
    let mut selected: HashSet<String> = active.clone();
    let mut recommended_seed_ids: Vec<String> = Vec::new();
    let mut recommended_added_ids: Vec<String> = Vec::new();
    let mut recommended_cost = 0usize;

    for candidate in &candidates {
        let add_ids: Vec<&String> = candidate
            .closure_ids
            .iter()
            .filter(|id| !selected.contains(id.as_str()))
            .collect();
        let add_cost = cost_of(add_ids.iter().copied(), &node_by_id);
        if recommended_cost + add_cost > budget {
            continue;
        }
        recommended_seed_ids.push(candidate.seed_id.clone());
        recommended_cost += add_cost;
        for id in add_ids {
            selected.insert(id.clone());
            recommended_added_ids.push(id.clone());
        }
        if recommended_seed_ids.len() >= top_k {
            break;
        }
    }

    debug!(
        terms = query_terms.len(),
        candidates = candidates.len(),
        accepted = recommended_seed_ids.len(),
        cost = recommended_cost,
        budget,
        "unfold plan ready"
    );

    PlanResult {
        query: query.to_string(),
        query_terms,
        budget_tokens: options.budget_tokens,
        closure_edge_types: options.closure_edge_types.clone(),
        closure_direction: options.closure_direction,
        max_closure_nodes: options.max_closure_nodes,
        candidates,
        recommended_added_count: recommended_added_ids.len(),
        recommended_seed_ids,
        recommended_added_ids,
        recommended_cost_tokens: recommended_cost,
    }
}

/// Expands each requested seed in turn and activates closures that fit the
/// remaining budget.
///
/// Unknown seeds are dropped without a step. A rejected seed records its
/// step with `accepted: false` and consumes nothing.
pub fn apply_unfold(
    seed_node_ids: &[String],
    nodes: &[NodeView],
    edges: &[EdgeView],
    active_ids: &[String],
    options: &ApplyOptions,
) -> ApplyResult {
    let node_by_id = index_nodes(nodes);
    let mut next_active = ordered_unique(active_ids);
    let original_active: HashSet<String> = next_active.iter().cloned().collect();
    let mut selected = original_active.clone();
    let budget = usize::max(1, options.budget_tokens);
    let mut used = 0usize;
    let mut steps: Vec<ApplyStep> = Vec::new();

    for seed_id in ordered_unique(seed_node_ids) {
        if !node_by_id.contains_key(seed_id.as_str()) {
            continue;
        }
        let closure = expand_closure(
            &[seed_id.clone()],
            edges,
            &options.closure_edge_types,
            options.max_closure_nodes,
            options.closure_direction,
        );
        let add_ids: Vec<String> = closure
            .ordered_ids
            .iter()
            .filter(|id| {
                node_by_id.contains_key(id.as_str()) && !selected.contains(id.as_str())
            })
            .cloned()
            .collect();
        let add_cost = cost_of(add_ids.iter(), &node_by_id);
        let accepted = used + add_cost <= budget;

        steps.push(ApplyStep {
            seed_id,
            candidate_add_ids: add_ids.clone(),
            candidate_cost_tokens: add_cost,
            accepted,
            closure,
        });

        if !accepted {
            continue;
        }
        used += add_cost;
        for id in add_ids {
            selected.insert(id.clone());
            next_active.push(id);
        }
    }

    let added_ids: Vec<String> = next_active
        .iter()
        .filter(|id| !original_active.contains(id.as_str()))
        .cloned()
        .collect();

    debug!(
        steps = steps.len(),
        added = added_ids.len(),
        used,
        budget,
        "unfold applied"
    );

    ApplyResult {
        next_active_ids: ordered_unique(&next_active),
        added_ids,
        used_tokens: used,
        budget_tokens: options.budget_tokens,
        closure_edge_types: options.closure_edge_types.clone(),
        closure_direction: options.closure_direction,
        max_closure_nodes: options.max_closure_nodes,
        steps,
    }
}
