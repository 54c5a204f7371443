//! Edge Data Structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed connection between two node handles
///
/// `source_handle` / `target_handle` are optional on the wire: absence means
/// "the node's only handle of that direction". Edges admitted through the
/// graph store always carry the resolved handle ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,

    pub source: String,

    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,

    /// Rendering hint only (e.g. "smoothstep")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl Edge {
    /// Create a new edge with an auto-generated id
    pub fn new(
        source: impl Into<String>,
        source_handle: Option<String>,
        target: impl Into<String>,
        target_handle: Option<String>,
    ) -> Self {
        Self {
            id: format!("edge-{}", Uuid::new_v4()),
            source: source.into(),
            target: target.into(),
            source_handle,
            target_handle,
            edge_type: None,
            animated: None,
            selected: None,
        }
    }

    /// Whether either endpoint of this edge is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }

    pub(crate) fn without_view_flags(&self) -> Self {
        Self {
            selected: None,
            ..self.clone()
        }
    }
}

/// A prospective connection drawn by the user, before it becomes an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(
        source: impl Into<String>,
        source_handle: Option<&str>,
        target: impl Into<String>,
        target_handle: Option<&str>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.map(str::to_string),
            target: target.into(),
            target_handle: target_handle.map(str::to_string),
        }
    }
}

impl From<&Edge> for Connection {
    fn from(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            source_handle: edge.source_handle.clone(),
            target: edge.target.clone(),
            target_handle: edge.target_handle.clone(),
        }
    }
}
