//! Performance benchmarks for Tuneflow graph operations
//!
//! Run with: `cargo bench -p tuneflow-core`
//!
//! These benchmarks measure the interactive hot paths:
//! - Connection admission while dragging (`check_connection`)
//! - Node drag frames (`move_node`)
//! - Cascading delete of a heavily connected node
//! - Snapshot export/import for a 500-node graph

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use tuneflow_core::{Connection, GraphStore, Node, NodeKind, Position};

/// One dataset fanned out to `models` model nodes, each feeding a training config
fn build_pipeline(models: usize) -> (GraphStore, Node, Vec<Node>) {
    let mut store = GraphStore::default();
    let dataset = store
        .add_node(NodeKind::Dataset, Position::new(0.0, 0.0), json!({}))
        .unwrap();

    let mut model_nodes = Vec::with_capacity(models);
    for i in 0..models {
        let y = i as f64 * 120.0;
        let model = store
            .add_node(NodeKind::Model, Position::new(300.0, y), json!({}))
            .unwrap();
        let config = store
            .add_node(
                NodeKind::TrainingConfiguration,
                Position::new(600.0, y),
                json!({"epochs": 3}),
            )
            .unwrap();
        store.add_edge(&dataset.id, None, &model.id, None).unwrap();
        store.add_edge(&model.id, None, &config.id, None).unwrap();
        model_nodes.push(model);
    }

    (store, dataset, model_nodes)
}

fn bench_check_connection(c: &mut Criterion) {
    let (mut store, _, models) = build_pipeline(150);
    let dataset = store
        .add_node(NodeKind::Dataset, Position::new(0.0, -200.0), json!({}))
        .unwrap();
    // Rejected at the capacity step, the slowest path through admission
    let connection = Connection::new(&dataset.id, None, &models[75].id, None);

    c.bench_function("check_connection_500_nodes", |b| {
        b.iter(|| black_box(store.check_connection(black_box(&connection)).is_err()))
    });
}

fn bench_move_node(c: &mut Criterion) {
    let (mut store, dataset, _) = build_pipeline(150);
    let mut x = 0.0;

    c.bench_function("move_node_frame", |b| {
        b.iter(|| {
            x += 1.0;
            store
                .move_node(black_box(&dataset.id), Position::new(x, 0.0))
                .unwrap();
        })
    });
}

fn bench_cascading_remove(c: &mut Criterion) {
    c.bench_function("remove_node_with_150_edges", |b| {
        b.iter_batched(
            || build_pipeline(150),
            |(mut store, dataset, _)| black_box(store.remove_node(&dataset.id).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_snapshot_round_trip(c: &mut Criterion) {
    let (store, _, _) = build_pipeline(166);
    let snapshot = store.export_snapshot();

    c.bench_function("export_snapshot_500_nodes", |b| {
        b.iter(|| black_box(store.export_snapshot()))
    });

    c.bench_function("import_snapshot_500_nodes", |b| {
        b.iter_batched(
            || snapshot.clone(),
            |snapshot| {
                let mut target = GraphStore::default();
                black_box(target.import_snapshot(snapshot))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_check_connection,
    bench_move_node,
    bench_cascading_remove,
    bench_snapshot_round_trip
);
criterion_main!(benches);
