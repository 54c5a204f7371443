//! Service Layer Error Types

use crate::graph::GraphError;
use crate::persistence::CacheError;
use thiserror::Error;

/// Editor session errors
///
/// Graph mutations report [`GraphError`] directly; this type covers setting up
/// and hydrating a session.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Configuration rejected by `EditorConfig::validate`
    #[error("Invalid editor configuration: {0}")]
    InvalidConfig(String),

    /// Hydration requested before any editing context was opened
    #[error("No editing context is open")]
    NoContext,

    /// Local cache could not be set up
    #[error("Snapshot cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EditorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
