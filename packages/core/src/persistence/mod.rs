//! Persistence Layer
//!
//! - `GraphBackend` - durable copy of each model's graph (async)
//! - `SnapshotCache` - local per-context cache read during hydration (sync)
//! - `HydrationGate` and `reconcile` - startup ordering and last-writer-wins

mod backend;
mod cache;
mod error;
mod hydration;

pub use backend::{GraphBackend, InMemoryGraphBackend, SaveGraphRequest};
pub use cache::{CacheRead, FileSnapshotCache, MemorySnapshotCache, SnapshotCache};
pub use error::{CacheError, HydrationError, PersistenceError};
pub use hydration::{
    reconcile, HydrationGate, HydrationReport, HydrationSource, HydrationState, Reconciliation,
};
