//! Configuration for the braid engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::types::{edge_types, Direction};

/// Engine configuration, loadable from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Embedding dimensionality every supplied vector must match
    #[serde(default = "default_embed_dim")]
    pub embed_dim: usize,

    /// Unfold planner defaults
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Hierarchy preview defaults
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
}

/// Defaults for the unfold planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum accepted candidates per plan
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Ranked candidate list length cap
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Token budget for a selection round
    #[serde(default = "default_budget_tokens")]
    pub budget_tokens: usize,

    /// Edge types followed during closure expansion
    #[serde(default = "default_closure_edge_types")]
    pub closure_edge_types: Vec<String>,

    /// Closure traversal direction
    #[serde(default = "default_closure_direction")]
    pub closure_direction: Direction,

    /// Closure size cap; `None` leaves expansion unbounded
    #[serde(default = "default_max_closure_nodes")]
    pub max_closure_nodes: Option<usize>,
}

/// Defaults for the hierarchy preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Leaf count under which a cluster stops splitting
    #[serde(default = "default_max_leaf_size")]
    pub max_leaf_size: usize,
}

fn default_embed_dim() -> usize {
    1536
}

fn default_top_k() -> usize {
    8
}

fn default_max_candidates() -> usize {
    16
}

fn default_budget_tokens() -> usize {
    1200
}

fn default_closure_edge_types() -> Vec<String> {
    vec![
        edge_types::DEPENDS.to_string(),
        edge_types::HAS_PART.to_string(),
        edge_types::SPLIT_FROM.to_string(),
        edge_types::REFERENCES.to_string(),
    ]
}

fn default_closure_direction() -> Direction {
    Direction::Both
}

fn default_max_closure_nodes() -> Option<usize> {
    Some(12)
}

fn default_max_leaf_size() -> usize {
    6
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_candidates: default_max_candidates(),
            budget_tokens: default_budget_tokens(),
            closure_edge_types: default_closure_edge_types(),
            closure_direction: default_closure_direction(),
            max_closure_nodes: default_max_closure_nodes(),
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: default_max_leaf_size(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embed_dim: default_embed_dim(),
            planner: PlannerConfig::default(),
            hierarchy: HierarchyConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from an optional path, falling back to defaults
    /// when no path is given or the file is missing/unparsable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to load config from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.embed_dim, 1536);
        assert_eq!(config.planner.top_k, 8);
        assert_eq!(config.planner.budget_tokens, 1200);
        assert_eq!(config.planner.closure_direction, Direction::Both);
        assert_eq!(config.planner.max_closure_nodes, Some(12));
        assert_eq!(config.hierarchy.max_leaf_size, 6);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_from_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("braid.yaml");
        std::fs::write(
            &path,
            "embed_dim: 8\nplanner:\n  budget_tokens: 64\n",
        )
        .unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.embed_dim, 8);
        assert_eq!(config.planner.budget_tokens, 64);
        // untouched fields keep their defaults
        assert_eq!(config.planner.top_k, 8);
        assert_eq!(config.hierarchy.max_leaf_size, 6);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        let config = EngineConfig::load_or_default(Some(&path));
        assert_eq!(config, EngineConfig::default());
    }
}
