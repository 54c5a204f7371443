//! Connection Capacity Guard
//!
//! Capacity is enforced only when a connection is admitted. A handle that is
//! already over its limit (e.g. after a registry change) keeps its existing
//! edges; it just refuses new ones.

use crate::models::{Capacity, HandleSpec};

/// Whether `handle` can take one more edge given its current edge count
pub fn can_accept_connection(handle: &HandleSpec, current_edge_count: usize) -> bool {
    match handle.capacity {
        Capacity::Unbounded => true,
        Capacity::Limited(max) => current_edge_count < max as usize,
    }
}
