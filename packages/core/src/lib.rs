//! Tuneflow Core Graph Engine
//!
//! This crate provides the state engine behind the Tuneflow pipeline editor:
//! a typed, validated node graph (datasets, models, training configurations),
//! plus the persistence, hydration and autosave machinery around it.
//!
//! # Architecture
//!
//! - **Single owner**: one `GraphStore` per editing context, mutated only
//!   through its operations; consumers observe via events and selectors
//! - **Validated edges**: every committed edge passed handle compatibility and
//!   capacity checks, and no edge ever dangles
//! - **Full-state persistence**: cache writes and backend pushes carry the
//!   complete snapshot, reconciled last-writer-wins on `updatedAt`
//!
//! # Modules
//!
//! - [`models`] - Nodes, edges, handles, snapshots
//! - [`graph`] - Graph store, compatibility engine, capacity guard, events
//! - [`persistence`] - Backend and local cache contracts, hydration gate
//! - [`services`] - Autosave scheduler and the editor session
//! - [`config`] - Editor configuration

pub mod config;
pub mod graph;
pub mod models;
pub mod persistence;
pub mod services;

// Re-export commonly used types
pub use config::EditorConfig;
pub use graph::*;
pub use models::*;
pub use persistence::*;
pub use services::*;
