//! Snapshot views of thread graphs.
//!
//! Nodes and edges cross into the engine as immutable, strongly-typed views
//! constructed at the persistence boundary. Node metadata is a tagged union
//! validated there as well; the engine never inspects loosely-typed maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Edge-type vocabulary used across thread graphs.
pub mod edge_types {
    pub const NEXT: &str = "NEXT";
    pub const REPLY_TO: &str = "REPLY_TO";
    pub const INVOKES: &str = "INVOKES";
    pub const RETURNS: &str = "RETURNS";
    pub const USES: &str = "USES";
    pub const IN_RUN: &str = "IN_RUN";
    pub const USED_IN_RUN: &str = "USED_IN_RUN";
    pub const FOLDS: &str = "FOLDS";
    pub const HAS_PART: &str = "HAS_PART";
    pub const NEXT_PART: &str = "NEXT_PART";
    pub const SPLIT_FROM: &str = "SPLIT_FROM";
    pub const DEPENDS: &str = "DEPENDS";
    pub const REFERENCES: &str = "REFERENCES";
}

/// Per-type node metadata.
///
/// Only `Part` nodes carry a `parent_id` reference into the same graph; the
/// compiler uses it to suppress parents whose parts are active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeMeta {
    /// Chat message attribution.
    Message { role: Option<String> },

    /// Fold summary header.
    Fold { title: Option<String> },

    /// A chunk split out of a larger node.
    Part {
        parent_id: String,
        chunk_index: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk_kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_created_at: Option<DateTime<Utc>>,
    },

    /// External resource reference.
    Resource { name: Option<String> },

    /// No metadata attached.
    #[default]
    Empty,
}

impl NodeMeta {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeMeta::Empty)
    }

    /// Parent reference, present only on `Part` metadata.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            NodeMeta::Part { parent_id, .. } => Some(parent_id.as_str()),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<&str> {
        match self {
            NodeMeta::Message { role } => role.as_deref(),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            NodeMeta::Fold { title } => title.as_deref(),
            _ => None,
        }
    }

    pub fn resource_name(&self) -> Option<&str> {
        match self {
            NodeMeta::Resource { name } => name.as_deref(),
            _ => None,
        }
    }
}

/// Immutable view of one thread node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,

    /// Open-ended type tag ("Message", "Fold", "Resource", ...).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "NodeMeta::is_empty")]
    pub meta: NodeMeta,

    pub created_at: DateTime<Utc>,
}

impl NodeView {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            text: None,
            meta: NodeMeta::Empty,
            created_at,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_meta(mut self, meta: NodeMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Node text, empty when absent.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Immutable view of one directed, typed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub from_id: String,
    pub to_id: String,

    #[serde(rename = "type")]
    pub kind: String,
}

impl EdgeView {
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind: kind.into(),
        }
    }
}

/// Traversal direction for closure expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Out,
    In,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
            Direction::Both => "both",
        }
    }

    pub fn follows_out(&self) -> bool {
        matches!(self, Direction::Out | Direction::Both)
    }

    pub fn follows_in(&self) -> bool {
        matches!(self, Direction::In | Direction::Both)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            other => Err(CoreError::UnknownDirection(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_meta_accessors() {
        let msg = NodeMeta::Message {
            role: Some("user".to_string()),
        };
        assert_eq!(msg.role(), Some("user"));
        assert_eq!(msg.parent_id(), None);

        let part = NodeMeta::Part {
            parent_id: "p1".to_string(),
            chunk_index: 2,
            chunk_kind: Some("paragraph".to_string()),
            origin_created_at: None,
        };
        assert_eq!(part.parent_id(), Some("p1"));
        assert_eq!(part.role(), None);

        assert!(NodeMeta::Empty.is_empty());
    }

    #[test]
    fn test_meta_wire_format() {
        let meta = NodeMeta::Fold {
            title: Some("Sprint notes".to_string()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"kind":"fold","title":"Sprint notes"}"#);

        let back: NodeMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title(), Some("Sprint notes"));
    }

    #[test]
    fn test_node_view_serde_uses_type_key() {
        let node = NodeView::new(
            "n1",
            "Message",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
        .with_text("hello")
        .with_meta(NodeMeta::Message {
            role: Some("user".to_string()),
        });

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "Message");
        assert_eq!(json["meta"]["kind"], "message");

        let back: NodeView = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_view_meta_defaults_to_empty() {
        let json = r#"{"id":"n1","type":"Note","created_at":"2024-05-01T12:00:00Z"}"#;
        let node: NodeView = serde_json::from_str(json).unwrap();
        assert!(node.meta.is_empty());
        assert_eq!(node.text_or_empty(), "");
    }

    #[test]
    fn test_direction_parse_and_display() {
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Both);
        assert_eq!(Direction::In.to_string(), "in");
        assert!("sideways".parse::<Direction>().is_err());
    }
}
