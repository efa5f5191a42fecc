//! Immutable machine definitions.

use crate::core::{Context, Event, State};
use crate::graph::{EdgeKind, Graph, TERMINAL_NODE};
use crate::runtime::config::RunConfig;
use crate::runtime::pipeline::StateHandler;
use crate::runtime::run::Run;
use std::collections::HashMap;
use std::sync::Arc;

/// A state's handler: receives a fresh pipeline and returns it after
/// calling whichever stages the state needs.
pub type Handler<C, S, E> =
    Arc<dyn Fn(StateHandler<C, S, E>) -> StateHandler<C, S, E> + Send + Sync>;

/// Declared edge used only for graph rendering. `to: None` means the
/// source state can terminate the run.
#[derive(Clone, Debug)]
pub(crate) struct DeclaredEdge {
    pub(crate) from: String,
    pub(crate) to: Option<String>,
    pub(crate) kind: EdgeKind,
}

pub(crate) struct Definition<C: Context, S: State, E: Event> {
    pub(crate) initial: S,
    pub(crate) states: Vec<S>,
    pub(crate) handlers: HashMap<String, Handler<C, S, E>>,
    pub(crate) edges: Vec<DeclaredEdge>,
    pub(crate) config: RunConfig,
}

impl<C: Context, S: State, E: Event> Definition<C, S, E> {
    pub(crate) fn handler(&self, state: &S) -> Option<&Handler<C, S, E>> {
        self.handlers.get(state.name())
    }
}

/// A finished machine definition.
///
/// Immutable and cheap to clone. Every [`start`](Machine::start) produces a
/// run with its own context, state and completion signal; runs never share
/// anything but the handler table.
pub struct Machine<C: Context, S: State, E: Event> {
    definition: Arc<Definition<C, S, E>>,
}

impl<C: Context, S: State, E: Event> Clone for Machine<C, S, E> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<C: Context, S: State, E: Event> Machine<C, S, E> {
    pub(crate) fn from_definition(definition: Definition<C, S, E>) -> Self {
        Self {
            definition: Arc::new(definition),
        }
    }

    pub fn initial(&self) -> &S {
        &self.definition.initial
    }

    /// Declared states, in declaration order.
    pub fn states(&self) -> &[S] {
        &self.definition.states
    }

    pub fn has_handler(&self, state: &S) -> bool {
        self.definition.handler(state).is_some()
    }

    /// Configuration used by [`start`](Machine::start).
    pub fn config(&self) -> &RunConfig {
        &self.definition.config
    }

    /// Start a run with the machine's configuration.
    pub fn start(&self, context: C) -> Run<C, S, E> {
        self.start_with(context, self.definition.config.clone())
    }

    /// Start a run with an explicit configuration.
    pub fn start_with(&self, context: C, config: RunConfig) -> Run<C, S, E> {
        Run::start(Arc::clone(&self.definition), context, config)
    }

    /// Transition graph built from the declared edges.
    ///
    /// Handlers are never invoked; only what the builder recorded is used.
    pub fn graph(&self) -> Graph {
        let mut graph = Graph::new();
        graph.set_initial_node(self.definition.initial.name());
        for state in &self.definition.states {
            graph.add_node(state.name());
        }
        for edge in &self.definition.edges {
            match &edge.to {
                Some(to) => graph.add_edge(&edge.from, to, edge.kind),
                None => {
                    graph.set_terminal_node(TERMINAL_NODE);
                    graph.add_edge(&edge.from, TERMINAL_NODE, edge.kind);
                }
            }
        }
        graph
    }
}
