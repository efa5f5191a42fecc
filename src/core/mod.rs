//! Core state machine types.
//!
//! This module contains the vocabulary shared by the store, the pipeline
//! and the run controller:
//! - States and events via the `State` and `Event` traits
//! - Guard and entry-action result adapters
//! - Transition history

mod event;
mod history;
mod outcome;
mod state;

pub use event::Event;
pub use history::{StateHistory, StateTransition};
pub use outcome::{ActionResult, GuardResult};
pub use state::State;

/// Marker for values usable as a machine's shared context.
///
/// Blanket-implemented for every `Clone + Send + Sync + 'static` type.
pub trait Context: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Context for T {}
