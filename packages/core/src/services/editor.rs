//! Graph Editor Session
//!
//! `GraphEditor` owns the graph store for one editing context and wires it to
//! the local cache, the backend and the autosave scheduler.
//!
//! # Lifecycle
//!
//! 1. `switch_context` resets the hydration gate, cancels pending saves for
//!    the previous context and clears the store
//! 2. `hydrate_from_cache` imports the cached snapshot (if any) and opens the
//!    gate; a corrupt entry is discarded and treated as a miss
//! 3. `apply_remote` reconciles the backend answer by `updatedAt`
//! 4. Every committed mutation is written through to the cache and scheduled
//!    for autosave
//!
//! `hydrate` runs steps 2 and 3 with a backend fetch in between; `open` runs
//! the whole sequence.

use crate::config::EditorConfig;
use crate::graph::{
    ColorToken, GraphError, GraphEvent, GraphState, GraphStore, PipelineReadiness,
    ResolvedConnection, SubscriptionId,
};
use crate::models::{
    Connection, Edge, GraphSnapshot, Node, NodeKind, NodeState, NodeTypeRegistry, Position,
    Viewport,
};
use crate::persistence::{
    reconcile, CacheRead, FileSnapshotCache, GraphBackend, HydrationGate, HydrationReport,
    HydrationSource, HydrationState, PersistenceError, Reconciliation, SnapshotCache,
};
use crate::services::{AutosaveScheduler, EditorError, SaveIndicator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Identifies whose graph is open: one model within a project, for one user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    pub model_id: String,
    pub project_id: String,
    pub user_id: String,
}

impl EditorContext {
    pub fn new(
        model_id: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            project_id: project_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Local cache key for this context
    pub fn cache_key(&self) -> String {
        format!("graph:{}:{}", self.project_id, self.model_id)
    }
}

impl fmt::Display for EditorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model {} (project {})", self.model_id, self.project_id)
    }
}

pub struct GraphEditor {
    config: EditorConfig,
    store: GraphStore,
    cache: Arc<dyn SnapshotCache>,
    backend: Arc<dyn GraphBackend>,
    autosave: AutosaveScheduler,
    gate: HydrationGate,
    context: Option<EditorContext>,
    /// The store holds a graph of its own (cache hit, backend import or edits)
    has_local: bool,
}

impl GraphEditor {
    /// Create an editor with no context open
    ///
    /// Must be called within a tokio runtime; the autosave task is spawned here.
    pub fn new(
        config: EditorConfig,
        registry: Arc<NodeTypeRegistry>,
        cache: Arc<dyn SnapshotCache>,
        backend: Arc<dyn GraphBackend>,
    ) -> Result<Self, EditorError> {
        config.validate().map_err(EditorError::invalid_config)?;

        let store = GraphStore::with_event_capacity(registry, config.event_channel_capacity);
        let autosave = AutosaveScheduler::spawn(
            backend.clone(),
            config.debounce(),
            config.min_saving_display(),
        );

        Ok(Self {
            config,
            store,
            cache,
            backend,
            autosave,
            gate: HydrationGate::new(),
            context: None,
            has_local: false,
        })
    }

    /// Create an editor caching snapshots on disk under `config`'s cache directory
    pub fn with_file_cache(
        config: EditorConfig,
        registry: Arc<NodeTypeRegistry>,
        backend: Arc<dyn GraphBackend>,
    ) -> Result<Self, EditorError> {
        let cache = FileSnapshotCache::from_config(&config)?;
        Self::new(config, registry, Arc::new(cache), backend)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn context(&self) -> Option<&EditorContext> {
        self.context.as_ref()
    }

    /// Read-only access; mutate through the editor so changes are persisted
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn state(&self) -> &GraphState {
        self.store.state()
    }

    //
    // LIFECYCLE
    //

    /// Switch to a different editing context and hydrate it
    pub async fn open(&mut self, context: EditorContext) -> Result<HydrationReport, EditorError> {
        self.switch_context(context);
        self.hydrate().await
    }

    /// Make `context` the active one, leaving the editor `Initializing`
    pub fn switch_context(&mut self, context: EditorContext) {
        tracing::info!("Opening graph editor for {}", context);
        self.gate.reset();
        self.autosave.switch_context(Some(context.clone()));
        self.store.clear();
        self.has_local = false;
        self.context = Some(context);
    }

    /// Close the active context without opening another
    pub fn close(&mut self) {
        if let Some(context) = self.context.take() {
            tracing::info!("Closing graph editor for {}", context);
        }
        self.gate.reset();
        self.autosave.switch_context(None);
        self.store.clear();
        self.has_local = false;
    }

    /// Cache step followed by the backend fetch and reconciliation
    pub async fn hydrate(&mut self) -> Result<HydrationReport, EditorError> {
        let mut cache_report = self.hydrate_from_cache()?;
        let model_id = match &self.context {
            Some(context) => context.model_id.clone(),
            None => return Err(EditorError::NoContext),
        };

        let result = self.backend.load_graph_by_model_id(&model_id).await;

        Ok(match self.apply_remote(&model_id, result) {
            Some(mut report) => {
                if report.notice.is_none() {
                    report.notice = cache_report.notice.take();
                }
                if report.import.is_none() {
                    report.import = cache_report.import.take();
                }
                report
            }
            None => cache_report,
        })
    }

    /// Import the locally cached snapshot, if any, and open the gate
    pub fn hydrate_from_cache(&mut self) -> Result<HydrationReport, EditorError> {
        let key = self
            .context
            .as_ref()
            .map(EditorContext::cache_key)
            .ok_or(EditorError::NoContext)?;

        let report = match self.cache.read(&key) {
            CacheRead::Hit(snapshot) => {
                tracing::info!(
                    "Hydrating from local cache {} ({} nodes)",
                    key,
                    snapshot.nodes.len()
                );
                let import = self.store.import_snapshot(snapshot);
                self.has_local = true;
                let mut report = HydrationReport::new(HydrationSource::Cache);
                report.import = Some(import);
                report
            }
            CacheRead::Miss => {
                tracing::debug!("No local cache for {}", key);
                HydrationReport::new(HydrationSource::Empty)
            }
            CacheRead::Corrupt(err) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, err);
                if let Err(e) = self.cache.remove(&key) {
                    tracing::warn!("Failed to remove cache entry {}: {}", key, e);
                }
                let mut report = HydrationReport::new(HydrationSource::Empty);
                report.notice = Some(format!("Discarded unreadable local copy: {}", err));
                report
            }
        };

        self.gate.open();
        Ok(report)
    }

    /// Reconcile a backend load result with the local graph
    ///
    /// Returns `None` when `model_id` is no longer the active context; the
    /// result belongs to a context the user already left.
    pub fn apply_remote(
        &mut self,
        model_id: &str,
        result: Result<Option<GraphSnapshot>, PersistenceError>,
    ) -> Option<HydrationReport> {
        let key = match &self.context {
            Some(context) if context.model_id == model_id => context.cache_key(),
            _ => {
                tracing::debug!("Ignoring backend graph for inactive model {}", model_id);
                return None;
            }
        };

        let local_source = if self.has_local {
            HydrationSource::Cache
        } else {
            HydrationSource::Empty
        };

        let report = match result {
            Err(e) => {
                tracing::warn!("Failed to load graph for model {}: {}", model_id, e);
                let mut report = HydrationReport::new(local_source);
                report.notice = Some(format!("Could not load the saved graph: {}", e));
                report
            }
            Ok(remote) => {
                let local = self.has_local.then(|| self.store.state().updated_at());
                match remote {
                    Some(snapshot)
                        if reconcile(local, Some(&snapshot)) == Reconciliation::UseRemote =>
                    {
                        tracing::info!(
                            "Backend graph for model {} supersedes local copy",
                            model_id
                        );
                        let import = self.store.import_snapshot(snapshot);
                        self.has_local = true;
                        if let Err(e) = self.cache.write(&key, &self.store.export_snapshot()) {
                            tracing::warn!("Failed to update cache entry {}: {}", key, e);
                        }
                        let mut report = HydrationReport::new(HydrationSource::Backend);
                        report.import = Some(import);
                        report
                    }
                    remote => {
                        let mut report = HydrationReport::new(local_source);
                        if reconcile(local, remote.as_ref())
                            == (Reconciliation::KeepLocal { push: true })
                        {
                            tracing::info!(
                                "Local graph for model {} is newer than the backend copy",
                                model_id
                            );
                            self.autosave.notify_mutation(self.store.export_snapshot());
                            report.save_scheduled = true;
                        }
                        report
                    }
                }
            }
        };

        self.gate.open();
        Some(report)
    }

    pub fn hydration_state(&self) -> HydrationState {
        self.gate.state()
    }

    pub fn subscribe_hydration(&self) -> watch::Receiver<HydrationState> {
        self.gate.subscribe()
    }

    //
    // MUTATIONS
    //

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
        initial_data: Value,
    ) -> Result<Node, GraphError> {
        self.ensure_ready()?;
        let node = self.store.add_node(kind, position, initial_data)?;
        self.persist();
        Ok(node)
    }

    /// Place a node dropped from the palette, identified by its type tag
    pub fn drop_node(&mut self, type_tag: &str, position: Position) -> Result<Node, GraphError> {
        self.ensure_ready()?;
        let node = self.store.add_node_of_type(type_tag, position, Value::Null)?;
        self.persist();
        Ok(node)
    }

    pub fn update_node_data(&mut self, node_id: &str, patch: &Value) -> Result<Node, GraphError> {
        self.ensure_ready()?;
        let node = self.store.update_node_data(node_id, patch)?;
        self.persist();
        Ok(node)
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphError> {
        self.ensure_ready()?;
        self.store.move_node(node_id, position)?;
        self.persist();
        Ok(())
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<Vec<String>, GraphError> {
        self.ensure_ready()?;
        let removed = self.store.remove_node(node_id)?;
        self.persist();
        Ok(removed)
    }

    pub fn check_connection(
        &self,
        connection: &Connection,
    ) -> Result<ResolvedConnection, GraphError> {
        self.store.check_connection(connection)
    }

    pub fn add_edge(
        &mut self,
        source: &str,
        source_handle: Option<&str>,
        target: &str,
        target_handle: Option<&str>,
    ) -> Result<Edge, GraphError> {
        self.ensure_ready()?;
        let edge = self
            .store
            .add_edge(source, source_handle, target, target_handle)?;
        self.persist();
        Ok(edge)
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<bool, GraphError> {
        self.ensure_ready()?;
        let removed = self.store.remove_edge(edge_id);
        if removed {
            self.persist();
        }
        Ok(removed)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), GraphError> {
        self.ensure_ready()?;
        self.store.set_viewport(viewport);
        self.persist();
        Ok(())
    }

    /// Selection is view state only; nothing is persisted
    pub fn select_node(&mut self, node_id: &str, selected: bool) -> Result<(), GraphError> {
        self.ensure_ready()?;
        self.store.select_node(node_id, selected)
    }

    pub fn select_edge(&mut self, edge_id: &str, selected: bool) -> Result<(), GraphError> {
        self.ensure_ready()?;
        self.store.select_edge(edge_id, selected)
    }

    //
    // QUERIES
    //

    pub fn edge_color(&self, edge_id: &str) -> Result<ColorToken, GraphError> {
        self.store.edge_color(edge_id)
    }

    pub fn node_state(&self, node_id: &str) -> Result<NodeState, GraphError> {
        self.store.node_state(node_id)
    }

    pub fn pipeline_readiness(&self) -> PipelineReadiness {
        self.store.pipeline_readiness()
    }

    pub fn export_snapshot(&self) -> GraphSnapshot {
        self.store.export_snapshot()
    }

    pub fn subscribe_to_events(&self) -> broadcast::Receiver<GraphEvent> {
        self.store.subscribe_to_events()
    }

    pub fn subscribe<T, S, F>(&mut self, selector: S, listener: F) -> SubscriptionId
    where
        T: PartialEq + Send + 'static,
        S: Fn(&GraphState) -> T + Send + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        self.store.subscribe(selector, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    //
    // SAVING
    //

    /// Push the current graph now instead of waiting for the debounce
    pub fn save_now(&mut self) -> Result<(), GraphError> {
        self.ensure_ready()?;
        self.persist();
        self.autosave.flush();
        Ok(())
    }

    pub fn save_indicator(&self) -> SaveIndicator {
        self.autosave.indicator()
    }

    pub fn subscribe_save_indicator(&self) -> watch::Receiver<SaveIndicator> {
        self.autosave.subscribe_indicator()
    }

    /// Push anything pending and stop the autosave task
    pub async fn shutdown(&self) {
        self.autosave.shutdown().await;
    }

    fn ensure_ready(&self) -> Result<(), GraphError> {
        if self.gate.is_ready() {
            return Ok(());
        }
        Err(GraphError::NotHydrated {
            context: self
                .context
                .as_ref()
                .map(|c| c.model_id.clone())
                .unwrap_or_else(|| "<no context>".to_string()),
        })
    }

    /// Write the committed state through to the cache and schedule a push
    fn persist(&mut self) {
        self.has_local = true;
        let Some(context) = &self.context else {
            return;
        };

        let snapshot = self.store.export_snapshot();
        let key = context.cache_key();
        if let Err(e) = self.cache.write(&key, &snapshot) {
            tracing::warn!("Failed to write cache entry {}: {}", key, e);
        }
        self.autosave.notify_mutation(snapshot);
    }
}

impl fmt::Debug for GraphEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEditor")
            .field("context", &self.context)
            .field("hydration", &self.gate.state())
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{InMemoryGraphBackend, MemorySnapshotCache};

    fn editor() -> GraphEditor {
        GraphEditor::new(
            EditorConfig::default(),
            Arc::new(NodeTypeRegistry::default()),
            Arc::new(MemorySnapshotCache::new()),
            Arc::new(InMemoryGraphBackend::new_fast()),
        )
        .unwrap()
    }

    #[test]
    fn test_cache_key() {
        let context = EditorContext::new("m1", "p1", "u1");
        assert_eq!(context.cache_key(), "graph:p1:m1");
        assert_eq!(context.to_string(), "model m1 (project p1)");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = EditorConfig {
            autosave_debounce_ms: 0,
            ..EditorConfig::default()
        };
        let result = GraphEditor::new(
            config,
            Arc::new(NodeTypeRegistry::default()),
            Arc::new(MemorySnapshotCache::new()),
            Arc::new(InMemoryGraphBackend::new_fast()),
        );
        assert!(matches!(result, Err(EditorError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_mutations_blocked_until_hydrated() {
        let mut editor = editor();
        assert!(matches!(
            editor.drop_node("dataset", Position::default()),
            Err(GraphError::NotHydrated { .. })
        ));

        editor.switch_context(EditorContext::new("m1", "p1", "u1"));
        assert_eq!(editor.hydration_state(), HydrationState::Initializing);
        assert!(editor.drop_node("dataset", Position::default()).is_err());

        editor.hydrate_from_cache().unwrap();
        assert_eq!(editor.hydration_state(), HydrationState::Ready);
        assert!(editor.drop_node("dataset", Position::default()).is_ok());
    }

    #[tokio::test]
    async fn test_hydrate_without_context() {
        let mut editor = editor();
        assert!(matches!(
            editor.hydrate_from_cache(),
            Err(EditorError::NoContext)
        ));
    }

    #[tokio::test]
    async fn test_drop_unknown_type() {
        let mut editor = editor();
        editor
            .open(EditorContext::new("m1", "p1", "u1"))
            .await
            .unwrap();

        assert_eq!(
            editor.drop_node("evaluation", Position::default()),
            Err(GraphError::UnknownNodeType("evaluation".to_string()))
        );
        assert!(editor.state().nodes().is_empty());
    }

    #[tokio::test]
    async fn test_remote_result_for_inactive_model_is_ignored() {
        let mut editor = editor();
        editor.switch_context(EditorContext::new("m2", "p1", "u1"));
        editor.hydrate_from_cache().unwrap();

        let stale = GraphSnapshot::empty(chrono::Utc::now());
        assert!(editor.apply_remote("m1", Ok(Some(stale))).is_none());
    }
}
