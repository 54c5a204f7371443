//! Read-only view of the committed graph
//!
//! `GraphState` is what queries and subscription selectors see. Every query is
//! computed from the current node/edge vectors on each call; nothing is cached.

use crate::models::{Edge, HandleRole, Node, NodeKind, Viewport};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphState {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) viewport: Viewport,
    pub(crate) updated_at: DateTime<Utc>,
}

impl GraphState {
    pub(crate) fn empty(updated_at: DateTime<Utc>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            updated_at,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Time of the last committed semantic mutation (or of the imported snapshot)
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    /// All nodes of the given kind, in insertion order
    pub fn query_nodes_by_type(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.kind == kind).collect()
    }

    /// All edges with `node_id` as source or target
    pub fn query_edges_for_node(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.touches(node_id)).collect()
    }

    /// Number of committed edges attached to one handle of one node
    pub fn handle_edge_count(&self, node_id: &str, handle_id: &str, role: HandleRole) -> usize {
        self.edges
            .iter()
            .filter(|e| match role {
                HandleRole::Source => {
                    e.source == node_id && e.source_handle.as_deref() == Some(handle_id)
                }
                HandleRole::Target => {
                    e.target == node_id && e.target_handle.as_deref() == Some(handle_id)
                }
            })
            .count()
    }

    /// Existing edge with exactly these endpoints, if any
    pub(crate) fn find_connection(
        &self,
        source: &str,
        source_handle: &str,
        target: &str,
        target_handle: &str,
    ) -> Option<&Edge> {
        self.edges.iter().find(|e| {
            e.source == source
                && e.target == target
                && e.source_handle.as_deref() == Some(source_handle)
                && e.target_handle.as_deref() == Some(target_handle)
        })
    }

    pub(crate) fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }
}
