//! Typed Payload Views
//!
//! Node payloads are stored as plain JSON objects on [`Node::data`]. The types in
//! this module are read-side views over that JSON: they validate the payload
//! shape for each [`NodeKind`] and answer configuration questions without the
//! store having to know individual field names.

use crate::models::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Payload of a dataset node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trained: Option<bool>,
}

/// Payload of a model node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
}

/// Payload of a training-configuration node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfigData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
}

impl TrainingConfigData {
    fn check_ranges(&self) -> Result<(), String> {
        if self.epochs == Some(0) {
            return Err("epochs must be greater than 0".to_string());
        }
        if self.batch_size == Some(0) {
            return Err("batchSize must be greater than 0".to_string());
        }
        if let Some(lr) = self.learning_rate {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(format!("learningRate must be a positive number, got {}", lr));
            }
        }
        Ok(())
    }
}

/// Kind-tagged typed view of a node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Dataset(DatasetData),
    Model(ModelData),
    TrainingConfiguration(TrainingConfigData),
}

impl NodeData {
    /// Parse and validate a payload for the given kind
    ///
    /// The payload must be a JSON object whose known fields have the right
    /// types. Unknown fields are tolerated (the frontend may carry extra
    /// display state), they are simply not part of the typed view.
    pub fn parse(kind: NodeKind, data: &Value) -> Result<Self, String> {
        if !data.is_object() {
            return Err(format!("{} payload must be a JSON object", kind));
        }

        let parsed = match kind {
            NodeKind::Dataset => serde_json::from_value(data.clone()).map(NodeData::Dataset),
            NodeKind::Model => serde_json::from_value(data.clone()).map(NodeData::Model),
            NodeKind::TrainingConfiguration => {
                serde_json::from_value(data.clone()).map(NodeData::TrainingConfiguration)
            }
        }
        .map_err(|e| format!("Invalid {} payload: {}", kind, e))?;

        if let NodeData::TrainingConfiguration(config) = &parsed {
            config.check_ranges()?;
        }

        Ok(parsed)
    }

    /// Typed view of an existing node's payload
    pub fn of(node: &Node) -> Result<Self, String> {
        Self::parse(node.kind, &node.data)
    }

    pub fn title(&self) -> &str {
        match self {
            NodeData::Dataset(d) => &d.title,
            NodeData::Model(m) => &m.title,
            NodeData::TrainingConfiguration(t) => &t.title,
        }
    }

    /// Whether all fields required for training are present
    pub fn is_configured(&self) -> bool {
        match self {
            NodeData::Dataset(d) => d.dataset_id.as_deref().is_some_and(|id| !id.is_empty()),
            NodeData::Model(m) => m.model_id.as_deref().is_some_and(|id| !id.is_empty()),
            NodeData::TrainingConfiguration(t) => {
                t.epochs.is_some() && t.learning_rate.is_some() && t.batch_size.is_some()
            }
        }
    }
}

/// Default payload a freshly placed node starts with
pub fn default_data(kind: NodeKind) -> Value {
    match kind {
        NodeKind::Dataset => json!({
            "title": "Dataset",
            "description": "Select or upload a dataset"
        }),
        NodeKind::Model => json!({
            "title": "Model",
            "description": "Choose a base model to fine-tune"
        }),
        NodeKind::TrainingConfiguration => json!({
            "title": "Training configuration",
            "description": "Set epochs, learning rate and batch size"
        }),
    }
}

/// Apply a JSON merge patch to a payload object
///
/// Object keys in `patch` overwrite keys in `target`; a `null` value removes the
/// key. Nested objects are merged recursively.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Some(patch_obj) = patch.as_object() else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Some(target_obj) = target.as_object_mut() {
        for (key, value) in patch_obj {
            if value.is_null() {
                target_obj.remove(key);
            } else if value.is_object() {
                let entry = target_obj.entry(key.clone()).or_insert(Value::Null);
                merge_patch(entry, value);
            } else {
                target_obj.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Per-node configuration state, derived from payload completeness and wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    /// Placed on the canvas, required fields still missing
    Placed,
    /// Required fields present
    Configured,
    /// Configured and every input handle connected
    ReadyForTraining,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_parses_for_every_kind() {
        for kind in NodeKind::ALL {
            let data = NodeData::parse(kind, &default_data(kind)).unwrap();
            assert!(!data.title().is_empty());
            assert!(!data.is_configured());
        }
    }

    #[test]
    fn test_parse_rejects_non_object_payload() {
        assert!(NodeData::parse(NodeKind::Dataset, &json!("dataset")).is_err());
        assert!(NodeData::parse(NodeKind::Model, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_rejects_wrongly_typed_fields() {
        let err = NodeData::parse(
            NodeKind::TrainingConfiguration,
            &json!({"epochs": "three"}),
        )
        .unwrap_err();
        assert!(err.contains("Invalid trainingConfiguration payload"));
    }

    #[test]
    fn test_training_ranges() {
        assert!(NodeData::parse(NodeKind::TrainingConfiguration, &json!({"epochs": 0})).is_err());
        assert!(
            NodeData::parse(NodeKind::TrainingConfiguration, &json!({"batchSize": 0})).is_err()
        );
        assert!(NodeData::parse(
            NodeKind::TrainingConfiguration,
            &json!({"learningRate": -0.1})
        )
        .is_err());
        assert!(NodeData::parse(
            NodeKind::TrainingConfiguration,
            &json!({"epochs": 3, "learningRate": 0.0002, "batchSize": 8})
        )
        .unwrap()
        .is_configured());
    }

    #[test]
    fn test_dataset_configured_requires_non_empty_id() {
        let data = NodeData::parse(NodeKind::Dataset, &json!({"datasetId": ""})).unwrap();
        assert!(!data.is_configured());

        let data = NodeData::parse(NodeKind::Dataset, &json!({"datasetId": "ds_42"})).unwrap();
        assert!(data.is_configured());
    }

    #[test]
    fn test_merge_patch_overwrites_and_removes() {
        let mut target = json!({"title": "Dataset", "datasetId": "ds_1", "stats": {"rows": 10}});
        merge_patch(
            &mut target,
            &json!({"title": "Tickets", "datasetId": null, "stats": {"columns": 3}}),
        );

        assert_eq!(
            target,
            json!({"title": "Tickets", "stats": {"rows": 10, "columns": 3}})
        );
    }
}
