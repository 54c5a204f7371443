//! Graph Store Error Types
//!
//! All of these are recoverable at the store boundary: a rejected mutation is
//! simply not applied, and the caller turns the error into transient feedback.

use crate::models::{Capacity, DataType, HandleRole};
use thiserror::Error;

/// Reasons a connection is not admitted into the committed graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Data types or directions of the two handles do not line up
    #[error("Incompatible handles: {source_type} ({source_role}) cannot connect to {target_type} ({target_role})")]
    IncompatibleTypes {
        source_type: DataType,
        source_role: HandleRole,
        target_type: DataType,
        target_role: HandleRole,
    },

    /// The handle already carries its declared number of edges
    #[error("Handle {handle_id} on node {node_id} is at capacity ({capacity})")]
    CapacityExceeded {
        node_id: String,
        handle_id: String,
        capacity: Capacity,
    },

    /// Source and target are the same node
    #[error("Node {node_id} cannot connect to itself")]
    SelfLoop { node_id: String },

    /// An identical connection already exists
    #[error("Connection already exists as edge {edge_id}")]
    DuplicateEdge { edge_id: String },

    /// The referenced handle is not declared by the node's kind
    #[error("Node {node_id} has no {role} handle {handle}")]
    UnknownHandle {
        node_id: String,
        handle: String,
        role: HandleRole,
    },
}

impl ValidationError {
    pub fn self_loop(node_id: impl Into<String>) -> Self {
        Self::SelfLoop {
            node_id: node_id.into(),
        }
    }

    pub fn duplicate_edge(edge_id: impl Into<String>) -> Self {
        Self::DuplicateEdge {
            edge_id: edge_id.into(),
        }
    }

    pub fn unknown_handle(
        node_id: impl Into<String>,
        handle_id: Option<&str>,
        role: HandleRole,
    ) -> Self {
        Self::UnknownHandle {
            node_id: node_id.into(),
            handle: handle_id.unwrap_or("<default>").to_string(),
            role,
        }
    }
}

/// Graph store operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Node not found by ID (stale reference)
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Edge not found by ID (stale reference)
    #[error("Edge not found: {id}")]
    EdgeNotFound { id: String },

    /// Type tag outside the closed set of node kinds
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Payload does not match the node kind's shape
    #[error("Invalid data for node {node_id}: {reason}")]
    InvalidNodeData { node_id: String, reason: String },

    /// Connection rejected
    #[error("Connection rejected: {0}")]
    Validation(#[from] ValidationError),

    /// The editor has not finished hydrating its context
    #[error("Editor for {context} is still initializing")]
    NotHydrated { context: String },
}

impl GraphError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn edge_not_found(id: impl Into<String>) -> Self {
        Self::EdgeNotFound { id: id.into() }
    }

    pub fn invalid_node_data(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeData {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a stale-reference error the caller should just ignore
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound { .. } | Self::EdgeNotFound { .. })
    }

    /// The connection rejection, if this error is one
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
