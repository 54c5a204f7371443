//! Graph Snapshot
//!
//! The snapshot is the unit of persistence, both for the local cache and for
//! the backend: the complete node/edge/viewport state plus a schema version and
//! a timestamp used for last-writer-wins reconciliation.
//!
//! # Schema versions
//!
//! - **0**: legacy payloads without `schemaVersion`/`updatedAt`, which may use
//!   `"training"` as a node type
//! - **1**: current shape

use crate::models::{Edge, Node};
use crate::persistence::HydrationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Last camera position on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Complete serializable state of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
    pub schema_version: u32,
    pub updated_at: DateTime<Utc>,
}

impl GraphSnapshot {
    /// Empty graph stamped with the given time
    pub fn empty(updated_at: DateTime<Utc>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            schema_version: CURRENT_SCHEMA_VERSION,
            updated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Parse a snapshot of any supported schema version, migrating it forward
    pub fn from_json_value(mut value: Value) -> Result<Self, HydrationError> {
        let version = match value.get("schemaVersion") {
            None | Some(Value::Null) => 0,
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| HydrationError::parse(format!("invalid schemaVersion: {}", v)))?,
        };

        if version > CURRENT_SCHEMA_VERSION {
            return Err(HydrationError::UnsupportedSchemaVersion {
                found: version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        if version == 0 {
            migrate_v0(&mut value)?;
        }

        serde_json::from_value(value).map_err(|e| HydrationError::parse(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, HydrationError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| HydrationError::parse(e.to_string()))?;
        Self::from_json_value(value)
    }
}

fn migrate_v0(value: &mut Value) -> Result<(), HydrationError> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| HydrationError::parse("snapshot must be a JSON object"))?;

    if let Some(Value::Array(nodes)) = obj.get_mut("nodes") {
        for node in nodes.iter_mut() {
            if node.get("type").and_then(Value::as_str) == Some("training") {
                node["type"] = Value::String("trainingConfiguration".to_string());
            }
        }
    }

    obj.entry("edges").or_insert_with(|| Value::Array(Vec::new()));
    // Unknown age: any dated copy wins reconciliation against it
    obj.entry("updatedAt")
        .or_insert_with(|| Value::String(DateTime::<Utc>::UNIX_EPOCH.to_rfc3339()));
    obj.insert(
        "schemaVersion".to_string(),
        Value::from(CURRENT_SCHEMA_VERSION),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;
    use serde_json::json;

    #[test]
    fn test_snapshot_serialization_contract() {
        let snapshot = GraphSnapshot::empty(Utc::now());
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["schemaVersion"], 1);
        assert!(value["updatedAt"].is_string());
        assert_eq!(value["viewport"]["zoom"], 1.0);
        assert!(value["nodes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_migrates_legacy_payload() {
        let legacy = json!({
            "nodes": [
                {"id": "t1", "type": "training", "position": {"x": 1.0, "y": 2.0}, "data": {}}
            ],
            "viewport": {"x": 0.0, "y": 0.0, "zoom": 0.5}
        });

        let snapshot = GraphSnapshot::from_json_value(legacy).unwrap();
        assert_eq!(snapshot.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(snapshot.updated_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(snapshot.nodes[0].kind, NodeKind::TrainingConfiguration);
        assert!(snapshot.edges.is_empty());
        assert_eq!(snapshot.viewport.zoom, 0.5);
    }

    #[test]
    fn test_rejects_future_schema_version() {
        let future = json!({
            "nodes": [],
            "edges": [],
            "schemaVersion": 7,
            "updatedAt": "2026-01-01T00:00:00Z"
        });

        match GraphSnapshot::from_json_value(future) {
            Err(HydrationError::UnsupportedSchemaVersion { found, supported }) => {
                assert_eq!(found, 7);
                assert_eq!(supported, CURRENT_SCHEMA_VERSION);
            }
            other => panic!("Expected UnsupportedSchemaVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(GraphSnapshot::from_json_str("{not json").is_err());
        assert!(GraphSnapshot::from_json_str("[1, 2, 3]").is_err());
    }
}
