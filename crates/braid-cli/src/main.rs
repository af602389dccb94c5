//! Braid CLI
//!
//! Command-line interface for running the context engine against thread
//! snapshots exported as JSON.

use anyhow::{Context, Result};
use braid_context::{
    apply_unfold, compile_active_context, expand_closure, fold_members, node_preview,
    plan_unfold, ApplyOptions, PlanOptions,
};
use braid_core::{ActiveSet, Direction, EdgeView, EngineConfig, NodeView};
use braid_embed::{EmbeddingProvider, EmbeddingStore, HashingEmbedder, VectorIndex};
use braid_hierarchy::{build_hierarchy_preview, HierarchyOptions};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "braid")]
#[command(about = "Braid - deterministic context selection over thread graphs")]
#[command(version)]
struct Cli {
    /// Thread snapshot file (JSON)
    #[arg(short, long, global = true, default_value = "thread.json")]
    snapshot: PathBuf,

    /// Engine configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a typed-edge closure from seed nodes
    Closure {
        /// Seed node ids (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        seeds: Vec<String>,

        /// Edge types to follow (default: from config)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Traversal direction: out, in or both (default: from config)
        #[arg(long)]
        direction: Option<Direction>,

        /// Cap on distinct visited nodes (default: from config)
        #[arg(long)]
        max_nodes: Option<usize>,
    },

    /// Compile the active set into prompt text
    Compile {
        /// Print the rendered text only, without the explain report
        #[arg(long)]
        text: bool,
    },

    /// Rank unfold candidates for a query against the active set
    Plan {
        /// Query text
        query: String,

        /// How many candidates to recommend
        #[arg(long)]
        top_k: Option<usize>,

        /// Token budget for recommended additions
        #[arg(long)]
        budget: Option<usize>,

        /// How many scored candidates to keep
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Cap on closure size per candidate
        #[arg(long)]
        max_closure_nodes: Option<usize>,
    },

    /// Apply an unfold over chosen seeds and report the next active set
    Apply {
        /// Seed node ids (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        seeds: Vec<String>,

        /// Token budget for accepted closures
        #[arg(long)]
        budget: Option<usize>,
    },

    /// Replace a fold with its members in the active set
    Unfold {
        /// Fold node id
        fold_id: String,
    },

    /// Build a hierarchy preview of the whole thread
    Hierarchy {
        /// Leaf capacity per cluster
        #[arg(long)]
        max_leaf_size: Option<usize>,
    },

    /// Vector search over the snapshot
    Search {
        /// Query text
        query: String,

        /// Number of hits to return
        #[arg(long, default_value_t = 8)]
        k: usize,
    },

    /// Snapshot and embedding coverage statistics
    Stats,
}

/// One conversation thread exported by the host application.
#[derive(Debug, Deserialize)]
struct ThreadSnapshot {
    thread_id: String,
    #[serde(default)]
    nodes: Vec<NodeView>,
    #[serde(default)]
    edges: Vec<EdgeView>,
    #[serde(default)]
    active_ids: Vec<String>,
    #[serde(default)]
    embeddings: HashMap<String, Vec<f32>>,
}

impl ThreadSnapshot {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid snapshot JSON: {}", path.display()))
    }

    /// Embedding rows in stable id order.
    fn embedding_rows(&self) -> Vec<(String, Vec<f32>)> {
        let mut rows: Vec<(String, Vec<f32>)> = self
            .embeddings
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Vector width for this snapshot. Supplied rows win over the config
    /// so exported files work without a matching config on disk. Empty
    /// rows mark unembeddable nodes and are ignored.
    fn embed_dim(&self, config: &EngineConfig) -> usize {
        self.embeddings
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .min_by(|a, b| a.0.cmp(b.0))
            .map_or(config.embed_dim, |(_, v)| v.len())
    }
}

fn main() -> Result<()> {
    // Simple logging for CLI
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt().with_target(false).init();
    }

    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(cli.config.as_deref());
    let snapshot = ThreadSnapshot::load(&cli.snapshot)?;

    match cli.command {
        Commands::Closure {
            seeds,
            types,
            direction,
            max_nodes,
        } => cmd_closure(&snapshot, &config, seeds, types, direction, max_nodes),
        Commands::Compile { text } => cmd_compile(&snapshot, text),
        Commands::Plan {
            query,
            top_k,
            budget,
            max_candidates,
            max_closure_nodes,
        } => cmd_plan(
            &snapshot,
            &config,
            &query,
            top_k,
            budget,
            max_candidates,
            max_closure_nodes,
        ),
        Commands::Apply { seeds, budget } => cmd_apply(&snapshot, &config, seeds, budget),
        Commands::Unfold { fold_id } => cmd_unfold(&snapshot, &fold_id),
        Commands::Hierarchy { max_leaf_size } => cmd_hierarchy(&snapshot, &config, max_leaf_size),
        Commands::Search { query, k } => cmd_search(&snapshot, &config, &query, k),
        Commands::Stats => cmd_stats(&snapshot, &config),
    }
}

fn cmd_closure(
    snapshot: &ThreadSnapshot,
    config: &EngineConfig,
    seeds: Vec<String>,
    types: Vec<String>,
    direction: Option<Direction>,
    max_nodes: Option<usize>,
) -> Result<()> {
    let types = if types.is_empty() {
        config.planner.closure_edge_types.clone()
    } else {
        types
    };
    let direction = direction.unwrap_or(config.planner.closure_direction);
    let max_nodes = max_nodes.or(config.planner.max_closure_nodes);

    let result = expand_closure(&seeds, &snapshot.edges, &types, max_nodes, direction);
    print_json(&result)
}

fn cmd_compile(snapshot: &ThreadSnapshot, text_only: bool) -> Result<()> {
    let compiled = compile_active_context(&snapshot.nodes, &snapshot.active_ids, &snapshot.edges);
    if text_only {
        println!("{}", compiled.text);
        return Ok(());
    }
    print_json(&compiled)
}

fn cmd_plan(
    snapshot: &ThreadSnapshot,
    config: &EngineConfig,
    query: &str,
    top_k: Option<usize>,
    budget: Option<usize>,
    max_candidates: Option<usize>,
    max_closure_nodes: Option<usize>,
) -> Result<()> {
    let mut options = PlanOptions::from_config(&config.planner);
    if let Some(top_k) = top_k {
        options = options.with_top_k(top_k);
    }
    if let Some(budget) = budget {
        options = options.with_budget_tokens(budget);
    }
    if let Some(max_candidates) = max_candidates {
        options = options.with_max_candidates(max_candidates);
    }
    if let Some(cap) = max_closure_nodes {
        options = options.with_max_closure_nodes(Some(cap));
    }

    let plan = plan_unfold(
        query,
        &snapshot.nodes,
        &snapshot.edges,
        &snapshot.active_ids,
        &options,
    );
    print_json(&plan)
}

fn cmd_apply(
    snapshot: &ThreadSnapshot,
    config: &EngineConfig,
    seeds: Vec<String>,
    budget: Option<usize>,
) -> Result<()> {
    let mut options = ApplyOptions::from_config(&config.planner);
    if let Some(budget) = budget {
        options = options.with_budget_tokens(budget);
    }

    let result = apply_unfold(
        &seeds,
        &snapshot.nodes,
        &snapshot.edges,
        &snapshot.active_ids,
        &options,
    );
    print_json(&result)
}

fn cmd_unfold(snapshot: &ThreadSnapshot, fold_id: &str) -> Result<()> {
    let members = fold_members(&snapshot.edges, fold_id);
    if members.is_empty() {
        println!("No members recorded for fold {}", fold_id);
        return Ok(());
    }

    let mut active = ActiveSet::from_ids(&snapshot.active_ids);
    active.unfold_fold(fold_id, &members);

    println!("Fold {} has {} members:", fold_id, members.len());
    for id in &members {
        println!("  {}", id);
    }
    println!();
    println!("Active set after unfold ({} ids):", active.len());
    for id in active.ids() {
        println!("  {}", id);
    }
    Ok(())
}

fn cmd_hierarchy(
    snapshot: &ThreadSnapshot,
    config: &EngineConfig,
    max_leaf_size: Option<usize>,
) -> Result<()> {
    let mut options = HierarchyOptions::from_config(config);
    options.dim = snapshot.embed_dim(config);
    if let Some(max_leaf_size) = max_leaf_size {
        options = options.with_max_leaf_size(max_leaf_size);
    }

    let preview = build_hierarchy_preview(
        &snapshot.nodes,
        &snapshot.edges,
        &snapshot.embeddings,
        &options,
    )?;
    print_json(&preview)
}

fn cmd_search(
    snapshot: &ThreadSnapshot,
    config: &EngineConfig,
    query: &str,
    k: usize,
) -> Result<()> {
    let dim = snapshot.embed_dim(config);
    let embedder = HashingEmbedder::new(dim);

    // Supplied embeddings win; everything else falls back to hashed text.
    let mut rows: Vec<(String, Vec<f32>)> = Vec::new();
    for node in &snapshot.nodes {
        let supplied = snapshot.embeddings.get(node.id.as_str());
        if let Some(vector) = supplied.filter(|v| !v.is_empty()) {
            rows.push((node.id.clone(), vector.clone()));
            continue;
        }
        if let Some(vector) = embedder.embed(node.text_or_empty())? {
            rows.push((node.id.clone(), vector));
        }
    }

    let index = VectorIndex::new(dim);
    index
        .rebuild_thread(&snapshot.thread_id, rows)
        .context("Failed to index snapshot embeddings")?;

    let Some(query_vector) = embedder.embed(query)? else {
        println!("No hits.");
        return Ok(());
    };
    let hits = index.search(&snapshot.thread_id, &query_vector, k)?;
    if hits.is_empty() {
        println!("No hits.");
        return Ok(());
    }

    let text_by_id: HashMap<&str, &str> = snapshot
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.text_or_empty()))
        .collect();

    println!("Found {} hits:", hits.len());
    for hit in &hits {
        let preview = text_by_id
            .get(hit.node_id.as_str())
            .map(|text| node_preview(text, query, 80))
            .unwrap_or_default();
        println!("  {:.4}  {}  {}", hit.score, hit.node_id, preview);
    }
    Ok(())
}

fn cmd_stats(snapshot: &ThreadSnapshot, config: &EngineConfig) -> Result<()> {
    let dim = snapshot.embed_dim(config);
    let store = EmbeddingStore::from_rows(dim, snapshot.embedding_rows())
        .context("Failed to load snapshot embeddings")?;
    let report = store.coverage(&snapshot.nodes);
    let active = ActiveSet::from_ids(&snapshot.active_ids);

    println!("Thread {}", snapshot.thread_id);
    println!();
    println!("  Nodes:       {}", snapshot.nodes.len());
    println!("  Edges:       {}", snapshot.edges.len());
    println!("  Active:      {}", active.len());
    println!();
    println!("  Text nodes:  {}", report.total_text_nodes);
    println!(
        "  Embedded:    {} ({:.2}%)",
        report.embedded_nodes, report.coverage_percent
    );
    println!("  Vector dim:  {}", dim);

    if report.indexing_incomplete {
        println!();
        println!("  Some text nodes have no supplied embedding. Hierarchy and");
        println!("  search fall back to hashed lexical vectors for those.");
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
