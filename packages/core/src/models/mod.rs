//! Data Models
//!
//! This module contains the data structures of the pipeline graph:
//!
//! - `Node` / `NodeKind` - Placed units and the closed set of kinds
//! - `NodeData` - Typed views over the JSON payload of each kind
//! - `Edge` / `Connection` - Committed and prospective connections
//! - `HandleSpec` / `NodeTypeRegistry` - Typed connection points per kind
//! - `GraphSnapshot` / `Viewport` - The unit of persistence

mod edge;
mod handle;
mod node;
pub mod node_data;
mod snapshot;

pub use edge::{Connection, Edge};
pub use handle::{Capacity, DataType, HandleLookup, HandleRole, HandleSpec, NodeTypeRegistry};
pub use node::{Dimensions, Node, NodeKind, Position};
pub use node_data::{DatasetData, ModelData, NodeData, NodeState, TrainingConfigData};
pub use snapshot::{GraphSnapshot, Viewport, CURRENT_SCHEMA_VERSION};
