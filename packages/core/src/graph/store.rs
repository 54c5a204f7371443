//! Graph Store
//!
//! The authoritative in-memory graph for the model currently open in the
//! editor. All mutation goes through the operations defined here; consumers
//! read through [`GraphState`], domain events, or selector subscriptions.
//!
//! # Guarantees
//!
//! - Node and edge ids are unique
//! - No edge references a missing node, observable between any two calls
//! - Every committed edge passed the compatibility and capacity checks when it
//!   was admitted, and carries resolved handle ids
//! - Rejected operations change nothing and emit nothing
//!
//! Every operation is synchronous; the store never suspends.

use crate::graph::capacity::can_accept_connection;
use crate::graph::compatibility::{
    check_compatibility, connection_color, ConnectionContext, ColorToken, HandleRef,
};
use crate::graph::subscriptions::{SubscriptionId, Subscriptions};
use crate::graph::{GraphError, GraphEvent, GraphState, ValidationError};
use crate::models::node_data::{default_data, merge_patch};
use crate::models::{
    Connection, Edge, GraphSnapshot, HandleLookup, HandleRole, HandleSpec, Node, NodeData,
    NodeKind, NodeState, NodeTypeRegistry, Position, Viewport, CURRENT_SCHEMA_VERSION,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default capacity of the domain event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Handle ids a connection resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
}

/// An edge that `import_snapshot` refused to admit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedEdge {
    pub edge: Edge,
    pub reason: String,
}

/// Outcome of `import_snapshot`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub dropped_nodes: Vec<String>,
    pub dropped_edges: Vec<DroppedEdge>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_edges.is_empty()
    }
}

/// Configuration state of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReadiness {
    pub node_id: String,
    pub kind: NodeKind,
    pub state: NodeState,
}

/// Whether the pipeline can be submitted for training
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReadiness {
    pub ready: bool,
    /// Nodes not yet `ReadyForTraining`
    pub blocking: Vec<NodeReadiness>,
}

/// The canonical graph for one editing context
pub struct GraphStore {
    state: GraphState,
    registry: Arc<NodeTypeRegistry>,
    subscriptions: Subscriptions,
    event_tx: broadcast::Sender<GraphEvent>,
}

impl GraphStore {
    /// Empty store using the given node-type registry
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self::with_event_capacity(registry, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(registry: Arc<NodeTypeRegistry>, capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: GraphState::empty(Utc::now()),
            registry,
            subscriptions: Subscriptions::default(),
            event_tx,
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    /// Receive every domain event emitted after this call
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<GraphEvent> {
        self.event_tx.subscribe()
    }

    /// Run `listener` whenever the value derived by `selector` changes
    pub fn subscribe<T, S, F>(&mut self, selector: S, listener: F) -> SubscriptionId
    where
        T: PartialEq + Send + 'static,
        S: Fn(&GraphState) -> T + Send + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        self.subscriptions.add(&self.state, selector, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    //
    // NODE OPERATIONS
    //

    /// Place a new node
    ///
    /// `initial_data` is merged over the kind's default payload and must
    /// validate against the kind's payload shape.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
        initial_data: Value,
    ) -> Result<Node, GraphError> {
        let mut data = default_data(kind);
        if !initial_data.is_null() {
            if !initial_data.is_object() {
                return Err(GraphError::invalid_node_data(
                    kind.as_str(),
                    "initial data must be a JSON object",
                ));
            }
            merge_patch(&mut data, &initial_data);
        }
        NodeData::parse(kind, &data).map_err(|e| GraphError::invalid_node_data(kind.as_str(), e))?;

        let mut node = Node::new(kind, position, data);
        while self.state.contains_node(&node.id) {
            node = Node::new(kind, position, node.data);
        }

        self.state.nodes.push(node.clone());
        self.touch();
        tracing::debug!("Added {} node {}", kind, node.id);
        self.commit(GraphEvent::NodeAdded { node: node.clone() });
        Ok(node)
    }

    /// Place a node from an untyped tag (e.g. a palette drag payload)
    pub fn add_node_of_type(
        &mut self,
        type_tag: &str,
        position: Position,
        initial_data: Value,
    ) -> Result<Node, GraphError> {
        let kind: NodeKind = type_tag
            .parse()
            .map_err(|_| GraphError::UnknownNodeType(type_tag.to_string()))?;
        self.add_node(kind, position, initial_data)
    }

    /// Merge `patch` into a node's payload (JSON merge-patch semantics)
    pub fn update_node_data(&mut self, node_id: &str, patch: &Value) -> Result<Node, GraphError> {
        if !patch.is_object() {
            return Err(GraphError::invalid_node_data(
                node_id,
                "patch must be a JSON object",
            ));
        }

        let node = self
            .state
            .node(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;

        let mut data = node.data.clone();
        merge_patch(&mut data, patch);
        NodeData::parse(node.kind, &data).map_err(|e| GraphError::invalid_node_data(node_id, e))?;

        let updated = match self.state.node_mut(node_id) {
            Some(node) => {
                node.data = data;
                node.clone()
            }
            None => return Err(GraphError::node_not_found(node_id)),
        };

        self.touch();
        tracing::debug!("Updated data of node {}", node_id);
        self.commit(GraphEvent::NodeUpdated {
            node: updated.clone(),
        });
        Ok(updated)
    }

    /// Move a node; no validation beyond existence
    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphError> {
        let node = self
            .state
            .node_mut(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        node.position = position;

        self.touch();
        self.commit(GraphEvent::NodeMoved {
            node_id: node_id.to_string(),
            position,
        });
        Ok(())
    }

    /// Remove a node and every edge touching it, in one step
    ///
    /// Returns the ids of the removed edges.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Vec<String>, GraphError> {
        let index = self
            .state
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;

        self.state.nodes.remove(index);
        let mut removed_edges = Vec::new();
        self.state.edges.retain(|e| {
            if e.touches(node_id) {
                removed_edges.push(e.id.clone());
                false
            } else {
                true
            }
        });

        self.touch();
        tracing::debug!(
            "Removed node {} and {} attached edge(s)",
            node_id,
            removed_edges.len()
        );
        self.commit(GraphEvent::NodeRemoved {
            node_id: node_id.to_string(),
            removed_edges: removed_edges.clone(),
        });
        Ok(removed_edges)
    }

    /// Toggle the transient selection flag of a node
    pub fn select_node(&mut self, node_id: &str, selected: bool) -> Result<(), GraphError> {
        let node = self
            .state
            .node_mut(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        node.selected = Some(selected);
        self.subscriptions.notify(&self.state);
        Ok(())
    }

    //
    // EDGE OPERATIONS
    //

    /// Decide whether a connection would be admitted, without mutating anything
    pub fn check_connection(
        &self,
        connection: &Connection,
    ) -> Result<ResolvedConnection, GraphError> {
        admit(&self.state, &self.registry, connection)
    }

    /// Connect two handles
    ///
    /// On rejection nothing changes and the typed reason is returned.
    pub fn add_edge(
        &mut self,
        source: &str,
        source_handle: Option<&str>,
        target: &str,
        target_handle: Option<&str>,
    ) -> Result<Edge, GraphError> {
        self.add_connection(&Connection::new(source, source_handle, target, target_handle))
    }

    pub fn add_connection(&mut self, connection: &Connection) -> Result<Edge, GraphError> {
        let resolved = match admit(&self.state, &self.registry, connection) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!("Rejected connection {:?}: {}", connection, err);
                return Err(err);
            }
        };

        let mut edge = Edge::new(
            resolved.source,
            Some(resolved.source_handle),
            resolved.target,
            Some(resolved.target_handle),
        );
        while self.state.edge(&edge.id).is_some() {
            edge = Edge::new(
                edge.source,
                edge.source_handle,
                edge.target,
                edge.target_handle,
            );
        }

        self.state.edges.push(edge.clone());
        self.touch();
        tracing::debug!("Added edge {} ({} -> {})", edge.id, edge.source, edge.target);
        self.commit(GraphEvent::EdgeAdded { edge: edge.clone() });
        Ok(edge)
    }

    /// Remove an edge by id; returns whether anything was removed
    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        let before = self.state.edges.len();
        self.state.edges.retain(|e| e.id != edge_id);
        if self.state.edges.len() == before {
            return false;
        }

        self.touch();
        self.commit(GraphEvent::EdgeRemoved {
            edge_id: edge_id.to_string(),
        });
        true
    }

    /// Toggle the transient selection flag of an edge
    pub fn select_edge(&mut self, edge_id: &str, selected: bool) -> Result<(), GraphError> {
        let edge = self
            .state
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        edge.selected = Some(selected);
        self.subscriptions.notify(&self.state);
        Ok(())
    }

    /// Color token of a committed edge
    pub fn edge_color(&self, edge_id: &str) -> Result<ColorToken, GraphError> {
        let edge = self
            .state
            .edge(edge_id)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        let source = self
            .state
            .node(&edge.source)
            .ok_or_else(|| GraphError::node_not_found(&edge.source))?;
        let target = self
            .state
            .node(&edge.target)
            .ok_or_else(|| GraphError::node_not_found(&edge.target))?;

        Ok(connection_color(ConnectionContext::Committed {
            source_kind: source.kind,
            target_kind: target.kind,
            selected: edge.is_selected(),
        }))
    }

    //
    // VIEWPORT
    //

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
        self.touch();
        self.commit(GraphEvent::ViewportChanged { viewport });
    }

    //
    // QUERIES
    //

    pub fn query_nodes_by_type(&self, kind: NodeKind) -> Vec<&Node> {
        self.state.query_nodes_by_type(kind)
    }

    pub fn query_edges_for_node(&self, node_id: &str) -> Vec<&Edge> {
        self.state.query_edges_for_node(node_id)
    }

    /// Configuration state of a node, taking its wiring into account
    pub fn node_state(&self, node_id: &str) -> Result<NodeState, GraphError> {
        let node = self
            .state
            .node(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        Ok(self.derive_node_state(node))
    }

    fn derive_node_state(&self, node: &Node) -> NodeState {
        let configured = NodeData::of(node)
            .map(|data| data.is_configured())
            .unwrap_or(false);
        if !configured {
            return NodeState::Placed;
        }

        let inputs_connected = self
            .registry
            .handles_with_role(node.kind, HandleRole::Target)
            .all(|h| self.state.handle_edge_count(&node.id, &h.id, HandleRole::Target) > 0);

        if inputs_connected {
            NodeState::ReadyForTraining
        } else {
            NodeState::Configured
        }
    }

    /// Whether every node is ready for training
    ///
    /// An empty graph is never ready.
    pub fn pipeline_readiness(&self) -> PipelineReadiness {
        let blocking: Vec<NodeReadiness> = self
            .state
            .nodes
            .iter()
            .map(|node| NodeReadiness {
                node_id: node.id.clone(),
                kind: node.kind,
                state: self.derive_node_state(node),
            })
            .filter(|r| r.state != NodeState::ReadyForTraining)
            .collect();

        PipelineReadiness {
            ready: !self.state.nodes.is_empty() && blocking.is_empty(),
            blocking,
        }
    }

    //
    // SNAPSHOTS
    //

    /// Full state for persistence; transient view flags are left out
    pub fn export_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.state.nodes.iter().map(Node::without_view_flags).collect(),
            edges: self.state.edges.iter().map(Edge::without_view_flags).collect(),
            viewport: self.state.viewport,
            schema_version: CURRENT_SCHEMA_VERSION,
            updated_at: self.state.updated_at,
        }
    }

    /// Replace the whole graph with `snapshot`
    ///
    /// The new graph is built aside and swapped in at once. Edges that fail
    /// admission against the imported nodes (dangling, incompatible, over
    /// capacity, duplicated) are dropped and reported; nodes with a repeated
    /// id are dropped after the first occurrence. Everything else is kept.
    pub fn import_snapshot(&mut self, snapshot: GraphSnapshot) -> ImportReport {
        let mut report = ImportReport::default();
        let mut next = GraphState::empty(snapshot.updated_at);
        next.viewport = snapshot.viewport;

        let mut seen = HashSet::new();
        for node in snapshot.nodes {
            if !seen.insert(node.id.clone()) {
                tracing::warn!("Dropping node with duplicate id {} from snapshot", node.id);
                report.dropped_nodes.push(node.id);
                continue;
            }
            if let Err(reason) = NodeData::of(&node) {
                tracing::warn!("Imported node {} has an invalid payload: {}", node.id, reason);
            }
            next.nodes.push(node.without_view_flags());
        }

        for edge in snapshot.edges {
            if next.edge(&edge.id).is_some() {
                tracing::warn!("Dropping edge with duplicate id {} from snapshot", edge.id);
                report.dropped_edges.push(DroppedEdge {
                    reason: format!("duplicate edge id {}", edge.id),
                    edge,
                });
                continue;
            }

            match admit(&next, &self.registry, &Connection::from(&edge)) {
                Ok(resolved) => next.edges.push(Edge {
                    source_handle: Some(resolved.source_handle),
                    target_handle: Some(resolved.target_handle),
                    ..edge.without_view_flags()
                }),
                Err(err) => {
                    tracing::warn!("Dropping edge {} from snapshot: {}", edge.id, err);
                    report.dropped_edges.push(DroppedEdge {
                        reason: err.to_string(),
                        edge,
                    });
                }
            }
        }

        report.node_count = next.nodes.len();
        report.edge_count = next.edges.len();
        self.state = next;

        tracing::debug!(
            "Imported snapshot: {} node(s), {} edge(s), {} dropped edge(s)",
            report.node_count,
            report.edge_count,
            report.dropped_edges.len()
        );
        self.commit(GraphEvent::SnapshotImported {
            node_count: report.node_count,
            edge_count: report.edge_count,
            dropped_edges: report.dropped_edges.len(),
        });
        report
    }

    /// Empty the graph (used when the editing context changes)
    pub fn clear(&mut self) {
        self.state = GraphState::empty(Utc::now());
        self.commit(GraphEvent::Cleared);
    }

    //
    // INTERNALS
    //

    fn touch(&mut self) {
        self.state.updated_at = Utc::now().max(self.state.updated_at);
    }

    fn commit(&mut self, event: GraphEvent) {
        self.subscriptions.notify(&self.state);
        let event_type = event.event_type();
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No receivers for {} event", event_type);
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(Arc::new(NodeTypeRegistry::default()))
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.state.nodes.len())
            .field("edges", &self.state.edges.len())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

/// Admission check shared by `add_edge`, `check_connection` and imports
///
/// Order: endpoints exist, no self-loop, handles resolve, compatibility,
/// no duplicate, capacity on both ends.
fn admit(
    state: &GraphState,
    registry: &NodeTypeRegistry,
    connection: &Connection,
) -> Result<ResolvedConnection, GraphError> {
    let source = state
        .node(&connection.source)
        .ok_or_else(|| GraphError::node_not_found(&connection.source))?;
    let target = state
        .node(&connection.target)
        .ok_or_else(|| GraphError::node_not_found(&connection.target))?;

    if source.id == target.id {
        return Err(ValidationError::self_loop(&source.id).into());
    }

    let source_spec = resolve_handle(
        registry,
        source,
        connection.source_handle.as_deref(),
        HandleRole::Source,
    )?;
    let target_spec = resolve_handle(
        registry,
        target,
        connection.target_handle.as_deref(),
        HandleRole::Target,
    )?;

    check_compatibility(
        HandleRef::new(&source.id, source_spec),
        HandleRef::new(&target.id, target_spec),
    )?;

    if let Some(existing) =
        state.find_connection(&source.id, &source_spec.id, &target.id, &target_spec.id)
    {
        return Err(ValidationError::duplicate_edge(&existing.id).into());
    }

    for (node_id, spec) in [(&source.id, source_spec), (&target.id, target_spec)] {
        let current = state.handle_edge_count(node_id, &spec.id, spec.role);
        if !can_accept_connection(spec, current) {
            return Err(ValidationError::CapacityExceeded {
                node_id: node_id.clone(),
                handle_id: spec.id.clone(),
                capacity: spec.capacity,
            }
            .into());
        }
    }

    Ok(ResolvedConnection {
        source: source.id.clone(),
        source_handle: source_spec.id.clone(),
        target: target.id.clone(),
        target_handle: target_spec.id.clone(),
    })
}

/// Resolve one end of a connection to its declared handle
///
/// A handle declared with the opposite role still resolves, so the
/// compatibility check rejects the reversed attempt with both real endpoints.
fn resolve_handle<'r>(
    registry: &'r NodeTypeRegistry,
    node: &Node,
    handle_id: Option<&str>,
    role: HandleRole,
) -> Result<&'r HandleSpec, GraphError> {
    match registry.lookup(node.kind, handle_id, role) {
        HandleLookup::Found(spec) | HandleLookup::WrongRole(spec) => Ok(spec),
        HandleLookup::Missing => {
            Err(ValidationError::unknown_handle(&node.id, handle_id, role).into())
        }
    }
}
