//! Builder for constructing machine definitions.

use crate::builder::error::BuildError;
use crate::core::{Context, Event, State};
use crate::graph::{EdgeKind, TERMINAL_NODE};
use crate::runtime::{DeclaredEdge, Definition, Handler, Machine, RunConfig, StateHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing machine definitions with a fluent API.
///
/// ```rust
/// use stagehand::builder::MachineBuilder;
/// use stagehand::runtime::Next;
/// use stagehand::{event_enum, state_enum};
///
/// state_enum! {
///     enum Door {
///         Closed,
///         Open,
///     }
/// }
///
/// event_enum! {
///     enum Push {
///         Toggle,
///     }
/// }
///
/// let machine = MachineBuilder::<u32, Door, Push>::new()
///     .initial(Door::Closed)
///     .state(Door::Closed, |s| {
///         s.on_receive(|r| r.on("Toggle", |_, _, _| Next::To(Door::Open)))
///     })
///     .state(Door::Open, |s| {
///         s.on_entry(|_, set, _| set.update(|opened| *opened += 1))
///             .on_receive(|r| r.on("Toggle", |_, _, _| Next::To(Door::Closed)))
///     })
///     .edge(Door::Closed, Door::Open)
///     .edge(Door::Open, Door::Closed)
///     .build()
///     .unwrap();
///
/// let run = machine.start(0);
/// run.emit(Push::Toggle);
/// assert_eq!(run.state(), Door::Open);
/// assert_eq!(run.get(), 1);
/// ```
pub struct MachineBuilder<C: Context, S: State, E: Event> {
    initial: Option<S>,
    states: Vec<(S, Handler<C, S, E>)>,
    edges: Vec<(S, Option<S>, EdgeKind)>,
    config: RunConfig,
}

impl<C: Context, S: State, E: Event> MachineBuilder<C, S, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            states: Vec::new(),
            edges: Vec::new(),
            config: RunConfig::default(),
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Define a state's handler.
    ///
    /// The handler is called with a fresh pipeline on every entry into the
    /// state and on every event delivered while in it.
    pub fn state<F>(mut self, state: S, handler: F) -> Self
    where
        F: Fn(StateHandler<C, S, E>) -> StateHandler<C, S, E> + Send + Sync + 'static,
    {
        let handler: Handler<C, S, E> = Arc::new(handler);
        self.states.push((state, handler));
        self
    }

    /// Declare that `from` may transition to `to`. Used by the graph only.
    pub fn edge(mut self, from: S, to: S) -> Self {
        self.edges.push((from, Some(to), EdgeKind::Continue));
        self
    }

    /// Declare that a guard on `from` may redirect to `to`. Used by the
    /// graph only.
    pub fn guard_edge(mut self, from: S, to: S) -> Self {
        self.edges.push((from, Some(to), EdgeKind::Guard));
        self
    }

    /// Declare that `from` may terminate the run. Used by the graph only.
    pub fn terminal(mut self, from: S) -> Self {
        self.edges.push((from, None, EdgeKind::Continue));
        self
    }

    /// Configuration applied to every run started from the machine.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the machine definition.
    /// Returns an error if required fields are missing or inconsistent.
    pub fn build(self) -> Result<Machine<C, S, E>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let mut handlers = HashMap::with_capacity(self.states.len());
        let mut states = Vec::with_capacity(self.states.len());
        for (state, handler) in self.states {
            let name = state.name().to_string();
            if handlers.contains_key(&name) {
                return Err(BuildError::DuplicateState { state: name });
            }
            handlers.insert(name, handler);
            states.push(state);
        }

        if !handlers.contains_key(initial.name()) {
            return Err(BuildError::UndeclaredInitialState {
                state: initial.name().to_string(),
            });
        }

        let terminates = self.edges.iter().any(|(_, to, _)| to.is_none());
        if terminates && handlers.contains_key(TERMINAL_NODE) {
            return Err(BuildError::ReservedStateName {
                state: TERMINAL_NODE.to_string(),
            });
        }

        let declared = |state: &S| -> Result<String, BuildError> {
            let name = state.name().to_string();
            if handlers.contains_key(&name) {
                Ok(name)
            } else {
                Err(BuildError::UnknownEdgeState { state: name })
            }
        };
        let edges = self
            .edges
            .iter()
            .map(|(from, to, kind)| {
                Ok(DeclaredEdge {
                    from: declared(from)?,
                    to: to.as_ref().map(&declared).transpose()?,
                    kind: *kind,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(Machine::from_definition(Definition {
            initial,
            states,
            handlers,
            edges,
            config: self.config,
        }))
    }
}

impl<C: Context, S: State, E: Event> Default for MachineBuilder<C, S, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Next;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Active,
        Stopped,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Active => "Active",
                Self::Stopped => "Stopped",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Tick;

    impl Event for Tick {
        fn name(&self) -> &str {
            "Tick"
        }
    }

    type Builder = MachineBuilder<(), TestState, Tick>;

    #[test]
    fn builder_validates_required_fields() {
        let result = Builder::new().build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn builder_requires_states() {
        let result = Builder::new().initial(TestState::Idle).build();

        assert!(matches!(result, Err(BuildError::NoStates)));
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let result = Builder::new()
            .initial(TestState::Idle)
            .state(TestState::Idle, |s| s)
            .state(TestState::Idle, |s| s)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::DuplicateState { state }) if state == "Idle"
        ));
    }

    #[test]
    fn initial_state_needs_a_handler() {
        let result = Builder::new()
            .initial(TestState::Stopped)
            .state(TestState::Idle, |s| s)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::UndeclaredInitialState { state }) if state == "Stopped"
        ));
    }

    #[test]
    fn edges_must_reference_declared_states() {
        let result = Builder::new()
            .initial(TestState::Idle)
            .state(TestState::Idle, |s| s)
            .edge(TestState::Idle, TestState::Active)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::UnknownEdgeState { state }) if state == "Active"
        ));
    }

    #[test]
    fn terminal_edge_reserves_terminal_node_name() {
        crate::state_enum! {
            enum Lifecycle {
                Running,
                Terminated,
            }
        }

        let result = MachineBuilder::<(), Lifecycle, Tick>::new()
            .initial(Lifecycle::Running)
            .state(Lifecycle::Running, |s| s)
            .state(Lifecycle::Terminated, |s| s)
            .terminal(Lifecycle::Running)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::ReservedStateName { state }) if state == "Terminated"
        ));
    }

    #[test]
    fn fluent_api_builds_machine() {
        let machine = Builder::new()
            .initial(TestState::Idle)
            .state(TestState::Idle, |s| {
                s.on_receive(|r| r.on("Tick", |_, _, _| Next::To(TestState::Active)))
            })
            .state(TestState::Active, |s| s)
            .edge(TestState::Idle, TestState::Active)
            .terminal(TestState::Active)
            .build()
            .unwrap();

        assert_eq!(machine.initial(), &TestState::Idle);
        assert_eq!(machine.states().len(), 2);
        assert!(machine.has_handler(&TestState::Active));
        assert!(!machine.has_handler(&TestState::Stopped));
    }

    #[test]
    fn config_is_carried_into_the_machine() {
        let machine = Builder::new()
            .initial(TestState::Idle)
            .state(TestState::Idle, |s| s)
            .config(RunConfig::default().with_max_reentry_depth(4))
            .build()
            .unwrap();

        assert_eq!(machine.config().max_reentry_depth, Some(4));
    }
}
