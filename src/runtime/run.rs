//! The run controller: one independent execution of a machine definition.

use crate::core::{Context, Event, State, StateHistory, StateTransition};
use crate::runtime::completion::{Completion, Settler};
use crate::runtime::config::RunConfig;
use crate::runtime::error::RunError;
use crate::runtime::machine::Definition;
use crate::runtime::pipeline::{StateHandler, Trigger, Wiring};
use crate::store::{Patch, Store, Subscription};
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Unique identifier of a run, attached to every log record it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) struct Shared<C: Context, S: State, E: Event> {
    id: RunId,
    definition: Arc<Definition<C, S, E>>,
    config: RunConfig,
    context: Store<C>,
    state: Store<S>,
    settler: Settler,
    history: Mutex<StateHistory<S>>,
    /// Held for every pipeline dispatch. Reentrant so nested transitions on
    /// the dispatching thread proceed; other threads wait their turn.
    dispatch: ReentrantMutex<()>,
    depth: AtomicUsize,
    me: Weak<Self>,
}

impl<C: Context, S: State, E: Event> Shared<C, S, E> {
    fn wiring(&self) -> Wiring<C, S, E> {
        Wiring {
            run: self.id,
            context: self.context.clone(),
            state: self.state.clone(),
            emitter: Emitter {
                run: self.me.clone(),
            },
            settler: self.settler.clone(),
        }
    }

    /// Entry pipeline for a state-cell notification.
    fn enter(&self, state: &S) {
        let _dispatch = self.dispatch.lock();
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let _depth = DepthGuard(&self.depth);

        if let Some(limit) = self.config.max_reentry_depth {
            if depth > limit {
                warn!(run = %self.id, state = state.name(), limit, "re-entry depth exceeded");
                self.settler.reject(RunError::ReentryDepthExceeded {
                    state: state.name().to_string(),
                    limit,
                });
                return;
            }
        }

        let Some(handler) = self.definition.handler(state) else {
            trace!(run = %self.id, state = state.name(), "no handler; entry ignored");
            return;
        };
        debug!(run = %self.id, state = state.name(), depth, "entering state");
        handler(StateHandler::new(self.wiring(), state.clone(), Trigger::Entry));
    }

    /// Event pipeline for the state current at the time of the call.
    fn emit(&self, event: E) {
        let _dispatch = self.dispatch.lock();
        if self.settler.is_settled() {
            debug!(run = %self.id, event = event.name(), "run settled; event ignored");
            return;
        }

        let state = self.state.get();
        let Some(handler) = self.definition.handler(&state) else {
            trace!(run = %self.id, state = state.name(), event = event.name(), "no handler; event ignored");
            return;
        };
        debug!(run = %self.id, state = state.name(), event = event.name(), "delivering event");
        handler(StateHandler::new(self.wiring(), state, Trigger::Event(event)));
    }

    /// Write `target` only if the state cell still holds `expected`.
    ///
    /// The comparison and the write happen under the dispatch lock, so a
    /// pipeline running on another thread finishes before the check.
    fn transition_if(&self, expected: &S, target: S) -> bool {
        let _dispatch = self.dispatch.lock();
        self.state.set_if(expected, target)
    }

    fn record(&self, transition: StateTransition<S>) {
        self.history.lock().record(transition);
    }
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Delivers events into a run from entry actions or other owners.
///
/// Holds the run weakly: once every [`Run`] handle is dropped, emitting is
/// a no-op.
pub struct Emitter<C: Context, S: State, E: Event> {
    run: Weak<Shared<C, S, E>>,
}

impl<C: Context, S: State, E: Event> Clone for Emitter<C, S, E> {
    fn clone(&self) -> Self {
        Self {
            run: self.run.clone(),
        }
    }
}

impl<C: Context, S: State, E: Event> Emitter<C, S, E> {
    /// Deliver `event` to the run's current state.
    ///
    /// Any transition it causes is fully processed before this returns.
    pub fn emit(&self, event: E) {
        match self.run.upgrade() {
            Some(shared) => shared.emit(event),
            None => trace!(event = event.name(), "run dropped; event discarded"),
        }
    }

    /// Delayed transition: write `target` if the run still sits in
    /// `expected`. A dropped run is left alone.
    pub(crate) fn transition_if(&self, expected: &S, target: S) -> bool {
        self.run
            .upgrade()
            .is_some_and(|shared| shared.transition_if(expected, target))
    }
}

/// Handle to a started run.
///
/// Cloning yields another handle to the same run, and handles may be used
/// from any thread: pipeline dispatch is serialized per run. Dropping every
/// handle stops pipeline dispatch; timers already armed become no-ops, and
/// pending [`Completion`]s resolve to [`RunError::Abandoned`] unless the run
/// already settled.
pub struct Run<C: Context, S: State, E: Event> {
    shared: Arc<Shared<C, S, E>>,
}

impl<C: Context, S: State, E: Event> Clone for Run<C, S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Context, S: State, E: Event> Run<C, S, E> {
    /// Allocate fresh cells and drive the initial state's entry pipeline.
    ///
    /// The entry pipeline has completed by the time this returns.
    pub(crate) fn start(definition: Arc<Definition<C, S, E>>, context: C, config: RunConfig) -> Self {
        let id = RunId::new();
        let initial = definition.initial.clone();
        let history = StateHistory::with_limit(config.history_limit);

        let shared = Arc::new_cyclic(|me| Shared {
            id,
            definition,
            config,
            context: Store::new(context),
            state: Store::new(initial.clone()),
            settler: Settler::new(id),
            history: Mutex::new(history),
            dispatch: ReentrantMutex::new(()),
            depth: AtomicUsize::new(0),
            me: me.clone(),
        });
        debug!(run = %id, initial = initial.name(), "starting run");

        // Registered before the entry listener so transitions are recorded in
        // write order even when entry pipelines nest.
        let recorder = Arc::downgrade(&shared);
        let last: Mutex<Option<S>> = Mutex::new(None);
        shared.state.subscribe(move |state: &S| {
            let Some(shared) = recorder.upgrade() else {
                return;
            };
            let previous = last.lock().replace(state.clone());
            if let Some(from) = previous {
                shared.record(StateTransition::now(from, state.clone()));
            }
        });

        let entry = Arc::downgrade(&shared);
        shared.state.subscribe(move |state: &S| {
            if let Some(shared) = entry.upgrade() {
                shared.enter(state);
            }
        });

        Self { shared }
    }

    pub fn id(&self) -> RunId {
        self.shared.id
    }

    /// Current context.
    pub fn get(&self) -> C {
        self.shared.context.get()
    }

    /// Replace the context and notify subscribers.
    pub fn set(&self, value: C) {
        self.shared.context.set(value);
    }

    /// Mutate the context in place and notify subscribers.
    ///
    /// `f` runs while the context cell is locked; reading or writing this
    /// run's context from inside `f` deadlocks.
    pub fn update<F: FnOnce(&mut C)>(&self, f: F) {
        self.shared.context.update(f);
    }

    /// Merge a partial update into the context and notify subscribers.
    pub fn patch<P: Patch<C>>(&self, patch: P) {
        self.shared.context.update(|context| patch.apply(context));
    }

    /// Deliver an event to the current state.
    ///
    /// Transitions it causes, including nested entry pipelines, complete
    /// before this returns. Waits while another thread is dispatching into
    /// the same run.
    ///
    /// Ignored once the run has settled, after termination as well as after
    /// a failure. Events never reach a run that has already ended, so a
    /// receiver cannot write a state after `Next::End`.
    pub fn emit(&self, event: E) {
        self.shared.emit(event);
    }

    /// An emitter bound to this run.
    pub fn emitter(&self) -> Emitter<C, S, E> {
        Emitter {
            run: Arc::downgrade(&self.shared),
        }
    }

    /// Observe context changes. The listener is called immediately with the
    /// current context.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.shared.context.subscribe(listener)
    }

    /// The raw context cell.
    pub fn context(&self) -> &Store<C> {
        &self.shared.context
    }

    /// Current state.
    pub fn state(&self) -> S {
        self.shared.state.get()
    }

    pub fn completion(&self) -> Completion {
        self.shared.settler.completion()
    }

    /// Snapshot of the transitions recorded so far.
    pub fn history(&self) -> StateHistory<S> {
        self.shared.history.lock().clone()
    }
}
