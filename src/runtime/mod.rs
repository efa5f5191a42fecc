//! Runtime: transition pipeline and run controller.
//!
//! A [`Machine`] is an immutable table of state handlers. Starting it
//! allocates a context cell and a state cell, subscribes an entry listener
//! to the state cell and returns a [`Run`] handle. Every write to the state
//! cell builds a fresh [`StateHandler`] and passes it to the new state's
//! handler; [`Run::emit`] does the same for the current state with the
//! event attached.
//!
//! # Concurrency
//!
//! All cell writes notify synchronously, so a transition made inside a
//! pipeline runs the target state's entry pipeline on the same call stack
//! before the write returns. Only `on_entry_async` futures and `after`
//! timers run later, as tasks on the ambient tokio runtime.

mod completion;
mod config;
mod error;
mod machine;
mod pipeline;
mod run;

pub use completion::Completion;
pub use config::{RunConfig, DEFAULT_HISTORY_LIMIT};
pub use error::RunError;
pub use machine::{Handler, Machine};
pub use pipeline::{Next, Receivers, Setter, Stage, StateHandler};
pub use run::{Emitter, Run, RunId};

pub(crate) use machine::{DeclaredEdge, Definition};
