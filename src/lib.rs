//! Stagehand: a reactive finite state machine runtime
//!
//! A machine is a set of states, each with a handler that builds a small
//! transition pipeline: guards, entry actions, event receivers and delayed
//! transitions. Starting a machine creates a run with its own observable
//! context and state cells. Every write to the state cell re-runs the new
//! state's pipeline synchronously, so a transition and everything it
//! triggers have finished by the time the write returns.
//!
//! # Core Concepts
//!
//! - **State** and **Event**: named values, see the `state_enum!` and
//!   `event_enum!` macros
//! - **Store**: an observable cell that notifies listeners in order
//! - **StateHandler**: the per-invocation pipeline a state handler drives
//! - **Run**: one execution, with a completion signal that settles once
//!
//! # Example
//!
//! ```rust
//! use stagehand::{event_enum, state_enum, MachineBuilder, Next};
//!
//! state_enum! {
//!     enum Phase {
//!         Idle,
//!         Active,
//!     }
//! }
//!
//! event_enum! {
//!     enum Input {
//!         Inc,
//!         Done,
//!     }
//! }
//!
//! let machine = MachineBuilder::<u32, Phase, Input>::new()
//!     .initial(Phase::Idle)
//!     .state(Phase::Idle, |s| {
//!         s.on_receive(|r| {
//!             r.on("Inc", |_, set, _| {
//!                 set.update(|count| *count += 1);
//!                 Next::To(Phase::Active)
//!             })
//!         })
//!     })
//!     .state(Phase::Active, |s| {
//!         s.guard(|count: &u32| *count < 5, Phase::Idle).on_receive(|r| {
//!             r.on("Inc", |_, set, _| {
//!                 set.update(|count| *count += 1);
//!                 Next::Stay
//!             })
//!             .on("Done", |_, _, _| Next::End)
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! let run = machine.start(0);
//! run.emit(Input::Inc);
//! run.emit(Input::Inc);
//! run.emit(Input::Done);
//!
//! assert_eq!(run.get(), 2);
//! assert_eq!(run.state(), Phase::Active);
//! assert_eq!(run.completion().outcome(), Some(Ok(())));
//! ```

pub mod builder;
pub mod core;
pub mod graph;
pub mod runtime;
pub mod store;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use crate::core::{Context, Event, State, StateHistory, StateTransition};
pub use graph::Graph;
pub use runtime::{Completion, Emitter, Machine, Next, Run, RunConfig, RunError, Setter, StateHandler};
pub use store::{JsonContext, Patch, Store};
