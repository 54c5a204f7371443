//! Hydration Gate and Reconciliation
//!
//! The gate holds the editor in `Initializing` until the local cache has
//! resolved (hit or definitive miss), so an empty graph is never rendered and
//! then replaced a moment later. Reconciliation with the backend copy is
//! last-writer-wins on `updatedAt`.

use crate::graph::ImportReport;
use crate::models::GraphSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HydrationState {
    Initializing,
    Ready,
}

/// Observable open/closed flag for the editor UI
#[derive(Debug)]
pub struct HydrationGate {
    tx: watch::Sender<HydrationState>,
}

impl HydrationGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(HydrationState::Initializing);
        Self { tx }
    }

    pub fn state(&self) -> HydrationState {
        *self.tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == HydrationState::Ready
    }

    pub fn open(&self) {
        self.tx.send_replace(HydrationState::Ready);
    }

    /// Back to `Initializing` for a new editing context
    pub fn reset(&self) {
        self.tx.send_replace(HydrationState::Initializing);
    }

    pub fn subscribe(&self) -> watch::Receiver<HydrationState> {
        self.tx.subscribe()
    }
}

impl Default for HydrationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the graph currently shown came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HydrationSource {
    Cache,
    Backend,
    /// Nothing cached and nothing on the backend (or the backend failed)
    Empty,
}

/// Decision taken when the backend answer arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Replace the local graph with the backend copy
    UseRemote,
    /// Keep the local graph; `push` when the backend is behind it
    KeepLocal { push: bool },
}

/// Last-writer-wins on `updatedAt`
///
/// `local` is the timestamp of the graph held locally, `None` when the editor
/// has nothing of its own (cache miss and no edits since).
pub fn reconcile(local: Option<DateTime<Utc>>, remote: Option<&GraphSnapshot>) -> Reconciliation {
    match (local, remote) {
        (None, Some(_)) => Reconciliation::UseRemote,
        (None, None) => Reconciliation::KeepLocal { push: false },
        (Some(_), None) => Reconciliation::KeepLocal { push: true },
        (Some(local), Some(remote)) if remote.updated_at > local => Reconciliation::UseRemote,
        (Some(local), Some(remote)) => Reconciliation::KeepLocal {
            push: local > remote.updated_at,
        },
    }
}

/// Outcome of one hydration step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationReport {
    pub source: HydrationSource,
    /// Present when a snapshot was imported in this step
    pub import: Option<ImportReport>,
    /// Non-blocking message for the user (corrupt cache, backend failure)
    pub notice: Option<String>,
    /// An autosave was scheduled to bring the backend up to date
    pub save_scheduled: bool,
}

impl HydrationReport {
    pub(crate) fn new(source: HydrationSource) -> Self {
        Self {
            source,
            import: None,
            notice: None,
            save_scheduled: false,
        }
    }
}
