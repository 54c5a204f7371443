//! Editor Services
//!
//! - `GraphEditor` - one editing session: store, cache, backend and hydration
//! - `AutosaveScheduler` - debounced, single-in-flight backend pushes
//! - `AutosaveMachine` - the pure state machine behind the scheduler

pub mod autosave;
pub mod editor;
pub mod error;

pub use autosave::{AutosaveMachine, AutosavePhase, AutosaveScheduler, SaveIndicator};
pub use editor::{EditorContext, GraphEditor};
pub use error::EditorError;
