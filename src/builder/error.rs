//! Build errors for machine definitions.

use thiserror::Error;

/// Errors that can occur when building a machine definition.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No states defined. Add at least one with .state(state, handler)")]
    NoStates,

    #[error("State '{state}' is defined more than once")]
    DuplicateState { state: String },

    #[error("Initial state '{state}' has no handler. Define it with .state(state, handler)")]
    UndeclaredInitialState { state: String },

    #[error("Edge refers to undeclared state '{state}'")]
    UnknownEdgeState { state: String },

    #[error("State '{state}' clashes with the graph's terminal node. Rename it or drop .terminal()")]
    ReservedStateName { state: String },

    #[error("Invalid run configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
