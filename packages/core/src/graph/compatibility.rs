//! Handle Compatibility Engine
//!
//! Pure functions deciding whether a connection between two typed handles is
//! valid, and which color token a connection should be drawn with. Both are
//! consulted on every frame of a drag gesture, so they are O(1) and free of
//! side effects.

use crate::graph::ValidationError;
use crate::models::{HandleRole, HandleSpec, NodeKind};
use serde::{Deserialize, Serialize};

/// One resolved end of a connection
#[derive(Debug, Clone, Copy)]
pub struct HandleRef<'a> {
    pub node_id: &'a str,
    pub spec: &'a HandleSpec,
}

impl<'a> HandleRef<'a> {
    pub fn new(node_id: &'a str, spec: &'a HandleSpec) -> Self {
        Self { node_id, spec }
    }
}

/// Check a source/target handle pair, reporting why it is rejected
///
/// Rules, in order:
/// 1. Self-loops are always rejected.
/// 2. The source end must be a source handle and the target end a target
///    handle; reversed attempts are rejected, never flipped.
/// 3. Data types must match exactly unless either side is a wildcard.
pub fn check_compatibility(
    source: HandleRef<'_>,
    target: HandleRef<'_>,
) -> Result<(), ValidationError> {
    if source.node_id == target.node_id {
        return Err(ValidationError::self_loop(source.node_id));
    }

    let directions_ok =
        source.spec.role == HandleRole::Source && target.spec.role == HandleRole::Target;
    let types_ok = source.spec.wildcard
        || target.spec.wildcard
        || source.spec.data_type == target.spec.data_type;

    if directions_ok && types_ok {
        Ok(())
    } else {
        Err(ValidationError::IncompatibleTypes {
            source_type: source.spec.data_type,
            source_role: source.spec.role,
            target_type: target.spec.data_type,
            target_role: target.spec.role,
        })
    }
}

/// Whether a source/target handle pair may be connected
pub fn is_compatible(source: HandleRef<'_>, target: HandleRef<'_>) -> bool {
    check_compatibility(source, target).is_ok()
}

/// State of a connection being drawn by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftStatus {
    /// Dragging, not over any handle
    NotConnected,
    /// Hovering a handle that would accept the connection
    HoveringValid,
    /// Hovering a handle that would reject the connection
    HoveringInvalid,
}

impl DraftStatus {
    /// Status for a hovered target given the store's admission verdict
    pub fn from_verdict<E>(verdict: &Result<(), E>) -> Self {
        if verdict.is_ok() {
            DraftStatus::HoveringValid
        } else {
            DraftStatus::HoveringInvalid
        }
    }
}

/// Inputs to [`connection_color`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionContext {
    /// A new edge is being dragged
    Draft(DraftStatus),
    /// An edge already in the graph
    Committed {
        source_kind: NodeKind,
        target_kind: NodeKind,
        selected: bool,
    },
}

/// Visual status tokens, mapped to theme colors by the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorToken {
    Neutral,
    Valid,
    Invalid,
    Dataset,
    Training,
    Selected,
}

impl ColorToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorToken::Neutral => "neutral",
            ColorToken::Valid => "valid",
            ColorToken::Invalid => "invalid",
            ColorToken::Dataset => "dataset",
            ColorToken::Training => "training",
            ColorToken::Selected => "selected",
        }
    }

    /// Default theme color
    pub fn hex(&self) -> &'static str {
        match self {
            ColorToken::Neutral => "#94a3b8",
            ColorToken::Valid => "#22c55e",
            ColorToken::Invalid => "#ef4444",
            ColorToken::Dataset => "#3b82f6",
            ColorToken::Training => "#a855f7",
            ColorToken::Selected => "#f59e0b",
        }
    }
}

/// Derive the color token for a connection
pub fn connection_color(context: ConnectionContext) -> ColorToken {
    match context {
        ConnectionContext::Draft(DraftStatus::NotConnected) => ColorToken::Neutral,
        ConnectionContext::Draft(DraftStatus::HoveringValid) => ColorToken::Valid,
        ConnectionContext::Draft(DraftStatus::HoveringInvalid) => ColorToken::Invalid,
        ConnectionContext::Committed { selected: true, .. } => ColorToken::Selected,
        ConnectionContext::Committed {
            source_kind,
            target_kind,
            ..
        } => match (source_kind, target_kind) {
            (NodeKind::Dataset, NodeKind::Model) => ColorToken::Dataset,
            (NodeKind::Model, NodeKind::TrainingConfiguration) => ColorToken::Training,
            _ => ColorToken::Neutral,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capacity, DataType};

    fn source(data_type: DataType) -> HandleSpec {
        HandleSpec::source("out", data_type, Capacity::Unbounded)
    }

    fn target(data_type: DataType) -> HandleSpec {
        HandleSpec::target("in", data_type, Capacity::Limited(1))
    }

    #[test]
    fn test_matching_types_are_compatible() {
        let (s, t) = (source(DataType::Dataset), target(DataType::Dataset));
        assert!(is_compatible(HandleRef::new("a", &s), HandleRef::new("b", &t)));
    }

    #[test]
    fn test_mismatched_types_are_incompatible() {
        let (s, t) = (source(DataType::Dataset), target(DataType::Training));
        assert_eq!(
            check_compatibility(HandleRef::new("a", &s), HandleRef::new("b", &t)),
            Err(ValidationError::IncompatibleTypes {
                source_type: DataType::Dataset,
                source_role: HandleRole::Source,
                target_type: DataType::Training,
                target_role: HandleRole::Target,
            })
        );
    }

    #[test]
    fn test_reversed_direction_is_rejected() {
        let (s, t) = (source(DataType::Dataset), target(DataType::Dataset));
        // Target handle used as the source end and vice versa
        assert!(!is_compatible(HandleRef::new("a", &t), HandleRef::new("b", &s)));
        // Two sources
        assert!(!is_compatible(HandleRef::new("a", &s), HandleRef::new("b", &s)));
    }

    #[test]
    fn test_self_loop_rejected_regardless_of_types() {
        let (s, t) = (source(DataType::Model), target(DataType::Model));
        assert_eq!(
            check_compatibility(HandleRef::new("n", &s), HandleRef::new("n", &t)),
            Err(ValidationError::self_loop("n"))
        );
    }

    #[test]
    fn test_wildcard_accepts_any_type() {
        let s = source(DataType::Dataset);
        let t = target(DataType::Training).wildcard();
        assert!(is_compatible(HandleRef::new("a", &s), HandleRef::new("b", &t)));
    }

    #[test]
    fn test_draft_colors() {
        assert_eq!(
            connection_color(ConnectionContext::Draft(DraftStatus::NotConnected)),
            ColorToken::Neutral
        );
        assert_eq!(
            connection_color(ConnectionContext::Draft(DraftStatus::HoveringValid)),
            ColorToken::Valid
        );
        assert_eq!(
            connection_color(ConnectionContext::Draft(DraftStatus::HoveringInvalid)),
            ColorToken::Invalid
        );
        assert_eq!(
            DraftStatus::from_verdict::<()>(&Err(())),
            DraftStatus::HoveringInvalid
        );
    }

    #[test]
    fn test_committed_colors() {
        let committed = |source_kind, target_kind, selected| ConnectionContext::Committed {
            source_kind,
            target_kind,
            selected,
        };

        assert_eq!(
            connection_color(committed(NodeKind::Dataset, NodeKind::Model, false)),
            ColorToken::Dataset
        );
        assert_eq!(
            connection_color(committed(
                NodeKind::Model,
                NodeKind::TrainingConfiguration,
                false
            )),
            ColorToken::Training
        );
        assert_eq!(
            connection_color(committed(NodeKind::Dataset, NodeKind::Model, true)),
            ColorToken::Selected
        );
        assert_eq!(
            connection_color(committed(NodeKind::Model, NodeKind::Model, false)),
            ColorToken::Neutral
        );
    }
}
