//! Domain Events for the Graph Store
//!
//! Events are emitted on a tokio broadcast channel after each committed
//! mutation, so other parts of the application (canvas renderer, inspector
//! panels, telemetry) can follow changes without coupling to the store.
//!
//! # Event Flow
//!
//! 1. `GraphStore` commits a mutation
//! 2. The matching `GraphEvent` is broadcast
//! 3. Every live receiver gets its own copy; lagging receivers skip ahead
//!
//! Rejected mutations emit nothing.

use crate::models::{Edge, Node, Position, Viewport};
use serde::Serialize;

/// Domain events emitted by the graph store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// A node was placed on the canvas
    NodeAdded { node: Node },

    /// A node's payload changed
    NodeUpdated { node: Node },

    /// A node was dragged to a new position
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: String, position: Position },

    /// A node was removed, along with every edge touching it
    #[serde(rename_all = "camelCase")]
    NodeRemoved {
        node_id: String,
        removed_edges: Vec<String>,
    },

    /// A connection was admitted
    EdgeAdded { edge: Edge },

    /// A connection was removed
    #[serde(rename_all = "camelCase")]
    EdgeRemoved { edge_id: String },

    /// The camera moved
    ViewportChanged { viewport: Viewport },

    /// The whole graph was replaced from a snapshot
    #[serde(rename_all = "camelCase")]
    SnapshotImported {
        node_count: usize,
        edge_count: usize,
        dropped_edges: usize,
    },

    /// The graph was emptied (context switch)
    Cleared,
}

impl GraphEvent {
    /// String representation of the event type, used for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            GraphEvent::NodeAdded { .. } => "node:added",
            GraphEvent::NodeUpdated { .. } => "node:updated",
            GraphEvent::NodeMoved { .. } => "node:moved",
            GraphEvent::NodeRemoved { .. } => "node:removed",
            GraphEvent::EdgeAdded { .. } => "edge:added",
            GraphEvent::EdgeRemoved { .. } => "edge:removed",
            GraphEvent::ViewportChanged { .. } => "viewport:changed",
            GraphEvent::SnapshotImported { .. } => "snapshot:imported",
            GraphEvent::Cleared => "graph:cleared",
        }
    }
}
