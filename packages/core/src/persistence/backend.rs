//! Backend Persistence Contract
//!
//! The durable copy of each model's graph lives behind [`GraphBackend`]. Saves
//! are full-replace upserts keyed by model id; loads return the latest saved
//! snapshot or `None` when nothing was ever saved.
//!
//! A saved graph keeps the `updatedAt` of the snapshot it was built from, not
//! the time the save landed. Edits made while a push is in flight are stamped
//! later than the pushed content, so reconciliation still prefers them.

use crate::models::{Edge, GraphSnapshot, Node, Viewport, CURRENT_SCHEMA_VERSION};
use crate::persistence::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Full graph state pushed for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGraphRequest {
    pub model_id: String,
    pub project_id: String,
    pub user_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
    pub updated_at: DateTime<Utc>,
}

impl SaveGraphRequest {
    pub fn from_snapshot(
        model_id: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        snapshot: GraphSnapshot,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            project_id: project_id.into(),
            user_id: user_id.into(),
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            viewport: snapshot.viewport,
            updated_at: snapshot.updated_at,
        }
    }
}

#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Upsert the graph for `request.model_id`; returns the backend record id
    async fn save_graph(&self, request: SaveGraphRequest) -> Result<String, PersistenceError>;

    /// Latest saved graph for a model, `None` if none was ever saved
    async fn load_graph_by_model_id(
        &self,
        model_id: &str,
    ) -> Result<Option<GraphSnapshot>, PersistenceError>;
}

#[derive(Debug, Clone)]
struct StoredGraph {
    record_id: String,
    snapshot: GraphSnapshot,
}

/// In-process backend for tests, demos and offline development
///
/// Keeps one record per model and records every save request. Latency and
/// failures can be injected.
pub struct InMemoryGraphBackend {
    graphs: Arc<Mutex<HashMap<String, StoredGraph>>>,
    history: Arc<Mutex<Vec<SaveGraphRequest>>>,
    save_failures: Arc<Mutex<VecDeque<PersistenceError>>>,
    load_failure: Arc<Mutex<Option<PersistenceError>>>,
    latency: Option<Duration>,
}

impl InMemoryGraphBackend {
    /// Backend with a 50ms simulated round-trip
    pub fn new() -> Self {
        Self::with_latency(Some(Duration::from_millis(50)))
    }

    /// Backend that answers immediately
    pub fn new_fast() -> Self {
        Self::with_latency(None)
    }

    pub fn with_latency(latency: Option<Duration>) -> Self {
        Self {
            graphs: Arc::new(Mutex::new(HashMap::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            save_failures: Arc::new(Mutex::new(VecDeque::new())),
            load_failure: Arc::new(Mutex::new(None)),
            latency,
        }
    }

    /// Pre-populate the stored graph for a model, keeping its `updatedAt`
    pub fn seed(&self, model_id: &str, snapshot: GraphSnapshot) -> Result<(), PersistenceError> {
        let mut graphs = self
            .graphs
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        graphs.insert(
            model_id.to_string(),
            StoredGraph {
                record_id: format!("graph-{}", Uuid::new_v4()),
                snapshot,
            },
        );
        Ok(())
    }

    /// Make the next save fail with `error` (queued, one per call)
    pub fn fail_next_save(&self, error: PersistenceError) -> Result<(), PersistenceError> {
        self.save_failures
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .push_back(error);
        Ok(())
    }

    /// Make every load fail with `error` until cleared with `None`
    pub fn set_load_failure(
        &self,
        error: Option<PersistenceError>,
    ) -> Result<(), PersistenceError> {
        *self
            .load_failure
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)? = error;
        Ok(())
    }

    /// Every save request received so far, including failed ones
    pub fn saved_requests(&self) -> Result<Vec<SaveGraphRequest>, PersistenceError> {
        Ok(self
            .history
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .clone())
    }

    pub fn save_count(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Currently stored snapshot for a model
    pub fn stored(&self, model_id: &str) -> Result<Option<GraphSnapshot>, PersistenceError> {
        let graphs = self
            .graphs
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(graphs.get(model_id).map(|g| g.snapshot.clone()))
    }

    async fn simulate_network_delay(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }
}

impl Default for InMemoryGraphBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphBackend for InMemoryGraphBackend {
    async fn save_graph(&self, request: SaveGraphRequest) -> Result<String, PersistenceError> {
        self.history
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .push(request.clone());

        self.simulate_network_delay().await;

        let failure = self
            .save_failures
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .pop_front();
        if let Some(err) = failure {
            return Err(err);
        }

        let mut graphs = self
            .graphs
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;

        let record_id = graphs
            .get(&request.model_id)
            .map(|g| g.record_id.clone())
            .unwrap_or_else(|| format!("graph-{}", Uuid::new_v4()));

        graphs.insert(
            request.model_id.clone(),
            StoredGraph {
                record_id: record_id.clone(),
                snapshot: GraphSnapshot {
                    nodes: request.nodes,
                    edges: request.edges,
                    viewport: request.viewport,
                    schema_version: CURRENT_SCHEMA_VERSION,
                    updated_at: request.updated_at,
                },
            },
        );

        Ok(record_id)
    }

    async fn load_graph_by_model_id(
        &self,
        model_id: &str,
    ) -> Result<Option<GraphSnapshot>, PersistenceError> {
        self.simulate_network_delay().await;

        if let Some(err) = self
            .load_failure
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .clone()
        {
            return Err(err);
        }

        let graphs = self
            .graphs
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(graphs.get(model_id).map(|g| g.snapshot.clone()))
    }
}
