//! Node Data Structures
//!
//! This module defines the `Node` struct placed on the pipeline canvas and the
//! closed set of node kinds it can have.
//!
//! # Architecture
//!
//! - **Universal Node**: A single struct represents every node kind
//! - **Pure JSON Payload**: Kind-specific fields live in the `data` object and are
//!   read through typed views (see [`crate::models::node_data`])
//! - **Immutable Kind**: `kind` is fixed at creation; changing semantics means
//!   deleting and recreating the node
//!
//! # Examples
//!
//! ```rust
//! use tuneflow_core::models::{Node, NodeKind, Position};
//! use serde_json::json;
//!
//! let node = Node::new(
//!     NodeKind::Dataset,
//!     Position::new(120.0, 80.0),
//!     json!({"title": "Support tickets", "description": "CSV upload"}),
//! );
//! assert!(node.id.starts_with("dataset-"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of node kinds available in the pipeline editor
///
/// Serialized as the React-Flow `type` tag. `"training"` is accepted as a
/// legacy alias of `trainingConfiguration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// A dataset selected or uploaded by the user
    Dataset,
    /// A base model to fine-tune
    Model,
    /// Hyper-parameters for the fine-tuning run
    #[serde(alias = "training", alias = "training-configuration")]
    TrainingConfiguration,
}

impl NodeKind {
    /// All node kinds, in palette order
    pub const ALL: [NodeKind; 3] = [
        NodeKind::Dataset,
        NodeKind::Model,
        NodeKind::TrainingConfiguration,
    ];

    /// Wire name of this kind (the `type` field of a serialized node)
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Dataset => "dataset",
            NodeKind::Model => "model",
            NodeKind::TrainingConfiguration => "trainingConfiguration",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(Self::Dataset),
            "model" => Ok(Self::Model),
            "trainingConfiguration" => Ok(Self::TrainingConfiguration),
            // Palette drag payloads and legacy snapshots
            "training" | "training-configuration" | "training_configuration" => {
                Ok(Self::TrainingConfiguration)
            }
            _ => Err(format!("Invalid node type: {}", s)),
        }
    }
}

/// 2D coordinate in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Last-known rendered size of a node, used for layout math only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// A placed unit in the pipeline graph
///
/// # Fields
///
/// - `id`: Unique, stable identifier within a graph
/// - `kind`: Node kind (serialized as `type`), immutable after creation
/// - `position`: Canvas coordinate, mutated by drag operations
/// - `data`: JSON object holding the kind-specific payload
/// - `measured`: Optional last rendered size (not semantically load-bearing)
/// - `selected` / `dragging`: Transient view flags, never exported in snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    pub position: Position,

    #[serde(default = "empty_object")]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Dimensions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dragging: Option<bool>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Node {
    /// Create a new Node with an auto-generated id of the form `<kind>-<uuid>`
    pub fn new(kind: NodeKind, position: Position, data: serde_json::Value) -> Self {
        Self {
            id: format!("{}-{}", kind.as_str(), Uuid::new_v4()),
            kind,
            position,
            data,
            measured: None,
            selected: None,
            dragging: None,
        }
    }

    /// Create a Node with a caller-provided id
    pub fn new_with_id(
        id: impl Into<String>,
        kind: NodeKind,
        position: Position,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            ..Self::new(kind, position, data)
        }
    }

    /// Whether the node is currently selected on the canvas
    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }

    /// Copy of this node without transient view flags
    pub(crate) fn without_view_flags(&self) -> Self {
        Self {
            selected: None,
            dragging: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kind_parsing() {
        assert_eq!("dataset".parse::<NodeKind>(), Ok(NodeKind::Dataset));
        assert_eq!("model".parse::<NodeKind>(), Ok(NodeKind::Model));
        assert_eq!(
            "trainingConfiguration".parse::<NodeKind>(),
            Ok(NodeKind::TrainingConfiguration)
        );
        assert_eq!(
            "training".parse::<NodeKind>(),
            Ok(NodeKind::TrainingConfiguration)
        );
        assert!("evaluation".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_node_wire_format() {
        let node = Node::new_with_id(
            "dataset-1",
            NodeKind::Dataset,
            Position::new(10.0, 20.0),
            json!({"title": "Reviews"}),
        );

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "dataset");
        assert_eq!(value["position"]["x"], 10.0);
        assert_eq!(value["data"]["title"], "Reviews");
        // Unset optional view fields are omitted entirely
        assert!(value.get("measured").is_none());
        assert!(value.get("selected").is_none());
    }

    #[test]
    fn test_node_deserializes_legacy_type_and_missing_data() {
        let node: Node = serde_json::from_value(json!({
            "id": "t-1",
            "type": "training",
            "position": {"x": 0.0, "y": 0.0}
        }))
        .unwrap();

        assert_eq!(node.kind, NodeKind::TrainingConfiguration);
        assert!(node.data.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_without_view_flags_strips_selection() {
        let mut node = Node::new(NodeKind::Model, Position::default(), json!({}));
        node.selected = Some(true);
        node.dragging = Some(true);
        node.measured = Some(Dimensions {
            width: 200.0,
            height: 90.0,
        });

        let stripped = node.without_view_flags();
        assert_eq!(stripped.selected, None);
        assert_eq!(stripped.dragging, None);
        assert_eq!(stripped.measured, node.measured);
        assert_eq!(stripped.id, node.id);
    }
}
