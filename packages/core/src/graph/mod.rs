//! Graph Layer
//!
//! The canonical pipeline graph and the rules it enforces:
//!
//! - `GraphStore` - nodes, edges and viewport for the open model
//! - Handle compatibility and color tokens for connection feedback
//! - Capacity limits per handle
//! - Domain events and selector subscriptions for consumers
//!
//! Everything here is synchronous and single-owner. Persistence lives in
//! [`crate::persistence`], autosave in [`crate::services`].

pub mod capacity;
pub mod compatibility;
mod error;
pub mod events;
mod state;
mod store;
mod subscriptions;

pub use capacity::can_accept_connection;
pub use compatibility::{
    check_compatibility, connection_color, is_compatible, ColorToken, ConnectionContext,
    DraftStatus, HandleRef,
};
pub use error::{GraphError, ValidationError};
pub use events::GraphEvent;
pub use state::GraphState;
pub use store::{
    DroppedEdge, GraphStore, ImportReport, NodeReadiness, PipelineReadiness, ResolvedConnection,
    DEFAULT_EVENT_CAPACITY,
};
pub use subscriptions::SubscriptionId;
