//! Handle Declarations and Node-Type Registry
//!
//! A handle is not a stored entity; it is a capability declared by a node kind.
//! The [`NodeTypeRegistry`] maps each [`NodeKind`] to the handles it exposes and
//! resolves `(kind, handle id, role)` lookups for the graph store.

use crate::models::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Data type flowing through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Dataset,
    Model,
    Training,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Dataset => f.write_str("dataset"),
            DataType::Model => f.write_str("model"),
            DataType::Training => f.write_str("training"),
        }
    }
}

/// Direction of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleRole {
    Source,
    Target,
}

impl fmt::Display for HandleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleRole::Source => f.write_str("source"),
            HandleRole::Target => f.write_str("target"),
        }
    }
}

/// Maximum number of simultaneous edges a handle may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capacity {
    Limited(u32),
    Unbounded,
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Limited(n) => write!(f, "{}", n),
            Capacity::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Declared capability of a node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleSpec {
    pub id: String,
    pub data_type: DataType,
    pub role: HandleRole,
    pub capacity: Capacity,
    /// Accepts connections of any data type (reserved for future node kinds)
    #[serde(default)]
    pub wildcard: bool,
}

impl HandleSpec {
    pub fn source(id: impl Into<String>, data_type: DataType, capacity: Capacity) -> Self {
        Self {
            id: id.into(),
            data_type,
            role: HandleRole::Source,
            capacity,
            wildcard: false,
        }
    }

    pub fn target(id: impl Into<String>, data_type: DataType, capacity: Capacity) -> Self {
        Self {
            id: id.into(),
            data_type,
            role: HandleRole::Target,
            capacity,
            wildcard: false,
        }
    }

    /// Mark this handle as accepting any data type
    pub fn wildcard(mut self) -> Self {
        self.wildcard = true;
        self
    }
}

/// Failure to resolve a handle reference against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleLookup<'a> {
    Found(&'a HandleSpec),
    /// The id exists on the kind but is declared with the other role
    WrongRole(&'a HandleSpec),
    /// No handle with that id (or no unique default for the role)
    Missing,
}

/// Handles exposed by each node kind
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    handles: HashMap<NodeKind, Vec<HandleSpec>>,
}

impl NodeTypeRegistry {
    /// Registry with no handles declared for any kind
    pub fn empty() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Replace the handles declared for `kind`
    pub fn with_handles(mut self, kind: NodeKind, handles: Vec<HandleSpec>) -> Self {
        self.handles.insert(kind, handles);
        self
    }

    pub fn handles(&self, kind: NodeKind) -> &[HandleSpec] {
        self.handles.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Handles of `kind` with the given role
    pub fn handles_with_role(
        &self,
        kind: NodeKind,
        role: HandleRole,
    ) -> impl Iterator<Item = &HandleSpec> {
        self.handles(kind).iter().filter(move |h| h.role == role)
    }

    /// Resolve a handle reference for one end of a connection
    ///
    /// An absent `handle_id` resolves to the kind's only handle with `role`;
    /// if the kind has zero or several such handles the lookup is `Missing`.
    pub fn lookup(
        &self,
        kind: NodeKind,
        handle_id: Option<&str>,
        role: HandleRole,
    ) -> HandleLookup<'_> {
        match handle_id {
            Some(id) => match self.handles(kind).iter().find(|h| h.id == id) {
                Some(spec) if spec.role == role => HandleLookup::Found(spec),
                Some(spec) => HandleLookup::WrongRole(spec),
                None => HandleLookup::Missing,
            },
            None => {
                let mut candidates = self.handles_with_role(kind, role);
                match (candidates.next(), candidates.next()) {
                    (Some(only), None) => HandleLookup::Found(only),
                    _ => HandleLookup::Missing,
                }
            }
        }
    }
}

impl Default for NodeTypeRegistry {
    /// Standard fine-tuning pipeline: dataset → model → training configuration
    fn default() -> Self {
        Self::empty()
            .with_handles(
                NodeKind::Dataset,
                vec![HandleSpec::source(
                    "output",
                    DataType::Dataset,
                    Capacity::Unbounded,
                )],
            )
            .with_handles(
                NodeKind::Model,
                vec![
                    HandleSpec::target("input", DataType::Dataset, Capacity::Limited(1)),
                    HandleSpec::source("output", DataType::Training, Capacity::Limited(1)),
                ],
            )
            .with_handles(
                NodeKind::TrainingConfiguration,
                vec![HandleSpec::target(
                    "input",
                    DataType::Training,
                    Capacity::Limited(1),
                )],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_declarations() {
        let registry = NodeTypeRegistry::default();

        let dataset = registry.handles(NodeKind::Dataset);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0].role, HandleRole::Source);
        assert_eq!(dataset[0].capacity, Capacity::Unbounded);

        assert_eq!(registry.handles(NodeKind::Model).len(), 2);
        assert!(registry
            .handles(NodeKind::TrainingConfiguration)
            .iter()
            .all(|h| h.role == HandleRole::Target && h.data_type == DataType::Training));
    }

    #[test]
    fn test_lookup_default_handle_by_role() {
        let registry = NodeTypeRegistry::default();

        match registry.lookup(NodeKind::Model, None, HandleRole::Target) {
            HandleLookup::Found(spec) => assert_eq!(spec.data_type, DataType::Dataset),
            other => panic!("Expected Found, got {:?}", other),
        }

        // Dataset nodes have no target handle at all
        assert_eq!(
            registry.lookup(NodeKind::Dataset, None, HandleRole::Target),
            HandleLookup::Missing
        );
    }

    #[test]
    fn test_lookup_explicit_id_with_wrong_role() {
        let registry = NodeTypeRegistry::default();

        assert!(matches!(
            registry.lookup(NodeKind::Model, Some("input"), HandleRole::Source),
            HandleLookup::WrongRole(_)
        ));
        assert_eq!(
            registry.lookup(NodeKind::Model, Some("weights"), HandleRole::Source),
            HandleLookup::Missing
        );
    }

    #[test]
    fn test_lookup_is_ambiguous_with_two_handles_of_same_role() {
        let registry = NodeTypeRegistry::empty().with_handles(
            NodeKind::Model,
            vec![
                HandleSpec::target("train", DataType::Dataset, Capacity::Limited(1)),
                HandleSpec::target("eval", DataType::Dataset, Capacity::Limited(1)),
            ],
        );

        assert_eq!(
            registry.lookup(NodeKind::Model, None, HandleRole::Target),
            HandleLookup::Missing
        );
        assert!(matches!(
            registry.lookup(NodeKind::Model, Some("eval"), HandleRole::Target),
            HandleLookup::Found(_)
        ));
    }
}
