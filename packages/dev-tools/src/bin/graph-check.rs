//! Snapshot Inspector
//!
//! Loads a saved graph snapshot (any supported schema version), imports it
//! into a fresh graph store and prints a JSON report: node counts per kind,
//! edge count, edges the store refused and why, and pipeline readiness.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin graph-check -- path/to/snapshot.json
//!
//! # Inspect the local cache entry for a context key
//! TUNEFLOW_CACHE_DIR=/tmp/cache cargo run --bin graph-check -- --cache graph:project-1:model-1
//!
//! # More detail on what was dropped
//! RUST_LOG=debug cargo run --bin graph-check -- path/to/snapshot.json
//! ```
//!
//! Exits non-zero when the snapshot cannot be parsed or when edges were
//! dropped during import.

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tuneflow_core::{
    EditorConfig, FileSnapshotCache, GraphSnapshot, GraphStore, NodeKind, NodeTypeRegistry,
};

const USAGE: &str = "usage: graph-check <snapshot.json> | graph-check --cache <cache-key>";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = EditorConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = match args.as_slice() {
        [flag, key] if flag == "--cache" => {
            let cache = FileSnapshotCache::from_config(&config)?;
            cache.path_for(key).display().to_string()
        }
        [path] => path.clone(),
        _ => anyhow::bail!(USAGE),
    };

    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let snapshot =
        GraphSnapshot::from_json_str(&raw).with_context(|| format!("parsing {}", path))?;
    tracing::info!(
        "Loaded {} ({} nodes, {} edges, updated {})",
        path,
        snapshot.nodes.len(),
        snapshot.edges.len(),
        snapshot.updated_at
    );

    let mut store = GraphStore::with_event_capacity(
        Arc::new(NodeTypeRegistry::default()),
        config.event_channel_capacity,
    );
    let import = store.import_snapshot(snapshot);

    let nodes_by_kind: serde_json::Map<String, serde_json::Value> = NodeKind::ALL
        .iter()
        .map(|kind| {
            (
                kind.as_str().to_string(),
                json!(store.query_nodes_by_type(*kind).len()),
            )
        })
        .collect();

    let report = json!({
        "file": path,
        "nodes": nodes_by_kind,
        "edges": import.edge_count,
        "droppedNodes": import.dropped_nodes,
        "droppedEdges": import.dropped_edges,
        "readiness": store.pipeline_readiness(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !import.is_clean() {
        tracing::warn!(
            "{} edge(s) and {} node(s) were dropped",
            import.dropped_edges.len(),
            import.dropped_nodes.len()
        );
        std::process::exit(2);
    }

    Ok(())
}
