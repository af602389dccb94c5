//! Braid Core Components
//!
//! Shared data model, active-set bookkeeping and configuration for the braid
//! context engine. Everything here is a plain value type: snapshots come in
//! from the persistence boundary, results go back out as serde-serializable
//! structs.

mod active;
mod config;
mod error;
mod ids;
mod types;

pub use active::{ActiveSet, ActiveSetLog, ActiveSetVersion};
pub use config::{EngineConfig, HierarchyConfig, PlannerConfig};
pub use error::{CoreError, Result};
pub use ids::{char_prefix, ordered_unique};
pub use types::{edge_types, Direction, EdgeView, NodeMeta, NodeView};
