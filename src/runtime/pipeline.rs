//! The transition pipeline.
//!
//! A [`StateHandler`] is built fresh for every state-cell notification and
//! every emitted event, handed to the current state's handler, and dropped
//! when the handler returns. Each stage method acts immediately when called,
//! in the order the handler calls them:
//!
//! | stage            | entry | event |
//! |------------------|-------|-------|
//! | `guard`          | yes   | yes   |
//! | `on_entry`       | yes   | no    |
//! | `on_receive`     | no    | yes   |
//! | `after`          | yes   | no    |
//!
//! A failed guard or a terminating receiver short-circuits the pipeline:
//! every later stage of the same pipeline is skipped, except that later
//! guards still write their fallback without evaluating their predicate.
//! The flag never carries over to another pipeline.
//!
//! Pipelines of one run never overlap. Dispatch is serialized per run, so a
//! delayed transition that comes due while a receiver is running waits for
//! the receiver and then re-checks the state.

use crate::core::{ActionResult, Context, Event, GuardResult, State};
use crate::runtime::completion::Settler;
use crate::runtime::error::RunError;
use crate::runtime::run::{Emitter, RunId};
use crate::store::{Patch, Store};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

/// Pipeline stages, as gated by what triggered the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Guard,
    Entry,
    Receive,
    After,
}

/// What caused a pipeline run.
#[derive(Clone, Debug)]
pub(crate) enum Trigger<E> {
    /// The state cell was written (or delivered its initial value).
    Entry,
    /// An event was emitted while in the state.
    Event(E),
}

impl<E> Trigger<E> {
    fn enables(&self, stage: Stage) -> bool {
        matches!(
            (self, stage),
            (_, Stage::Guard)
                | (Trigger::Entry, Stage::Entry | Stage::After)
                | (Trigger::Event(_), Stage::Receive)
        )
    }
}

/// Where an event receiver sends the machine next.
#[derive(Clone, Debug, PartialEq)]
pub enum Next<S> {
    /// Stay put; no state write.
    Stay,
    /// Write this state to the state cell.
    To(S),
    /// Terminate: resolve the run's completion signal. The state cell keeps
    /// its current value.
    End,
}

/// Run resources a pipeline acts on.
pub(crate) struct Wiring<C: Context, S: State, E: Event> {
    pub(crate) run: RunId,
    pub(crate) context: Store<C>,
    pub(crate) state: Store<S>,
    pub(crate) emitter: Emitter<C, S, E>,
    pub(crate) settler: Settler,
}

/// Writes partial updates into a run's context.
///
/// Every write republishes the context to its subscribers before returning.
pub struct Setter<C> {
    context: Store<C>,
}

impl<C> Clone for Setter<C> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<C: Context> Setter<C> {
    pub(crate) fn new(context: Store<C>) -> Self {
        Self { context }
    }

    /// Merge a partial update into the context.
    pub fn set<P: Patch<C>>(&self, patch: P) {
        self.context.update(|context| patch.apply(context));
    }

    /// Mutate the context in place.
    ///
    /// `f` runs while the context cell is locked; calling [`get`](Self::get)
    /// or any other write on this context from inside `f` deadlocks.
    pub fn update<F: FnOnce(&mut C)>(&self, f: F) {
        self.context.update(f);
    }

    /// Replace the whole context.
    pub fn replace(&self, value: C) {
        self.context.set(value);
    }

    /// Latest context value, including writes made after this setter was
    /// handed out.
    pub fn get(&self) -> C {
        self.context.get()
    }
}

/// Event receivers of one state, keyed by event name.
///
/// Built inside [`StateHandler::on_receive`]. Only the first receiver whose
/// name matches the delivered event runs.
pub struct Receivers<C: Context, S: State, E: Event> {
    event: E,
    context: C,
    setter: Setter<C>,
    matched: Option<Next<S>>,
}

impl<C: Context, S: State, E: Event> Receivers<C, S, E> {
    fn new(event: E, context: C, setter: Setter<C>) -> Self {
        Self {
            event,
            context,
            setter,
            matched: None,
        }
    }

    /// Receive the event named `name`.
    ///
    /// The handler gets the context, a setter, and the event itself (which
    /// carries any payload).
    pub fn on<F>(mut self, name: &str, handler: F) -> Self
    where
        F: FnOnce(&C, &Setter<C>, &E) -> Next<S>,
    {
        if self.matched.is_none() && self.event.name() == name {
            self.matched = Some(handler(&self.context, &self.setter, &self.event));
        }
        self
    }

    /// The event being delivered.
    pub fn event(&self) -> &E {
        &self.event
    }
}

/// Per-invocation transition pipeline for one state.
pub struct StateHandler<C: Context, S: State, E: Event> {
    wiring: Wiring<C, S, E>,
    current: S,
    trigger: Trigger<E>,
    stopped: bool,
}

impl<C: Context, S: State, E: Event> StateHandler<C, S, E> {
    pub(crate) fn new(wiring: Wiring<C, S, E>, current: S, trigger: Trigger<E>) -> Self {
        Self {
            wiring,
            current,
            trigger,
            stopped: false,
        }
    }

    /// The state this pipeline runs for.
    pub fn state(&self) -> &S {
        &self.current
    }

    /// The triggering event, or `None` for an entry pipeline.
    pub fn event(&self) -> Option<&E> {
        match &self.trigger {
            Trigger::Entry => None,
            Trigger::Event(event) => Some(event),
        }
    }

    /// Whether a guard or a terminating receiver has short-circuited this
    /// pipeline.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Require `predicate` to hold for the context, or redirect to `fallback`.
    ///
    /// Runs for entry and event pipelines alike. On `false` the pipeline
    /// short-circuits and `fallback` is written to the state cell, which
    /// re-enters the pipeline for `fallback` before this call returns. A
    /// predicate error rejects the run and short-circuits without a write.
    /// On an already short-circuited pipeline the predicate is not called
    /// and `fallback` is written unconditionally, so the last guard in a
    /// tripped chain decides where the run lands.
    pub fn guard<F, R>(self, predicate: F, fallback: S) -> Self
    where
        F: FnOnce(&C) -> R,
        R: GuardResult,
    {
        self.check_guard(|context| predicate(context).into_verdict(), fallback)
    }

    /// Like [`guard`](Self::guard), with the predicate applied to one field
    /// of the context picked out by `field`.
    pub fn guard_context<A, V, F, R>(self, field: A, predicate: F, fallback: S) -> Self
    where
        A: FnOnce(&C) -> V,
        F: FnOnce(&V) -> R,
        R: GuardResult,
    {
        self.check_guard(
            |context| predicate(&field(context)).into_verdict(),
            fallback,
        )
    }

    /// Run a synchronous entry action.
    ///
    /// Entry pipelines only. The action gets the context, a setter and an
    /// emitter; events it emits are delivered to the current state before
    /// this call returns. An error rejects the run.
    pub fn on_entry<F, R>(self, action: F) -> Self
    where
        F: FnOnce(&C, &Setter<C>, &Emitter<C, S, E>) -> R,
        R: ActionResult,
    {
        if !self.ready(Stage::Entry) {
            return self;
        }

        let context = self.wiring.context.get();
        let setter = Setter::new(self.wiring.context.clone());
        if let Err(message) = action(&context, &setter, &self.wiring.emitter).into_outcome() {
            self.fail_entry(message);
        }
        self
    }

    /// Run an asynchronous entry action without waiting for it.
    ///
    /// Entry pipelines only. The closure itself runs immediately; the future
    /// it returns is spawned on the current tokio runtime. If the future
    /// fails, the run is rejected. Without a runtime the run is rejected
    /// and the action is not called.
    pub fn on_entry_async<F, Fut, R>(self, action: F) -> Self
    where
        F: FnOnce(C, Setter<C>, Emitter<C, S, E>) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        R: ActionResult + 'static,
    {
        if !self.ready(Stage::Entry) {
            return self;
        }
        let Ok(runtime) = Handle::try_current() else {
            self.reject_no_runtime("on_entry_async");
            return self;
        };

        let future = action(
            self.wiring.context.get(),
            Setter::new(self.wiring.context.clone()),
            self.wiring.emitter.clone(),
        );
        let settler = self.wiring.settler.clone();
        let run = self.wiring.run;
        let state = self.current.name().to_string();
        runtime.spawn(async move {
            if let Err(message) = future.await.into_outcome() {
                warn!(run = %run, state = %state, error = %message, "async entry action failed");
                settler.reject(RunError::EntryAction { state, message });
            }
        });
        self
    }

    /// Dispatch the triggering event to its receiver.
    ///
    /// Event pipelines only. A missing receiver is a no-op. The matched
    /// receiver's [`Next`] decides what happens: `To` writes the state cell,
    /// `End` resolves the run and short-circuits, `Stay` does nothing.
    pub fn on_receive<F>(mut self, receivers: F) -> Self
    where
        F: FnOnce(Receivers<C, S, E>) -> Receivers<C, S, E>,
    {
        if !self.ready(Stage::Receive) {
            return self;
        }
        let event = match &self.trigger {
            Trigger::Event(event) => event.clone(),
            Trigger::Entry => return self,
        };
        let name = event.name().to_string();

        let receivers = receivers(Receivers::new(
            event,
            self.wiring.context.get(),
            Setter::new(self.wiring.context.clone()),
        ));

        match receivers.matched {
            None => {
                trace!(run = %self.wiring.run, state = self.current.name(), event = %name, "no receiver for event");
            }
            Some(Next::Stay) => {
                trace!(run = %self.wiring.run, state = self.current.name(), event = %name, "receiver kept state");
            }
            Some(Next::To(target)) => {
                debug!(
                    run = %self.wiring.run,
                    state = self.current.name(),
                    event = %name,
                    target = target.name(),
                    "transition"
                );
                self.wiring.state.set(target);
            }
            Some(Next::End) => {
                info!(run = %self.wiring.run, state = self.current.name(), event = %name, "run terminated");
                self.wiring.settler.resolve();
                self.stopped = true;
            }
        }
        self
    }

    /// Arm a delayed transition to `target`.
    ///
    /// Entry pipelines only. The state current at the time of the call is
    /// captured; when `delay` elapses, `target` is written only if the state
    /// cell still holds exactly that value. Later transitions make the timer
    /// a no-op rather than cancelling it. Without a tokio runtime the run is
    /// rejected.
    pub fn after(self, delay: Duration, target: S) -> Self {
        if !self.ready(Stage::After) {
            return self;
        }
        let Ok(runtime) = Handle::try_current() else {
            self.reject_no_runtime("after");
            return self;
        };

        let expected = self.wiring.state.get();
        let emitter = self.wiring.emitter.clone();
        let run = self.wiring.run;
        trace!(run = %run, state = expected.name(), target = target.name(), ?delay, "delayed transition armed");
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let target_name = target.name().to_string();
            if emitter.transition_if(&expected, target) {
                debug!(run = %run, from = expected.name(), target = %target_name, "delayed transition fired");
            } else {
                trace!(run = %run, expected = expected.name(), target = %target_name, "stale delayed transition ignored");
            }
        });
        self
    }

    fn check_guard<F>(mut self, evaluate: F, fallback: S) -> Self
    where
        F: FnOnce(&C) -> Result<bool, String>,
    {
        if !self.trigger.enables(Stage::Guard) {
            return self;
        }

        if self.stopped {
            trace!(
                run = %self.wiring.run,
                state = self.current.name(),
                fallback = fallback.name(),
                "pipeline stopped; writing guard fallback"
            );
            self.wiring.state.set(fallback);
            return self;
        }

        let context = self.wiring.context.get();
        match evaluate(&context) {
            Ok(true) => {}
            Ok(false) => {
                self.stopped = true;
                debug!(
                    run = %self.wiring.run,
                    state = self.current.name(),
                    fallback = fallback.name(),
                    "guard failed; redirecting"
                );
                self.wiring.state.set(fallback);
            }
            Err(message) => {
                self.stopped = true;
                warn!(run = %self.wiring.run, state = self.current.name(), error = %message, "guard evaluation failed");
                self.wiring.settler.reject(RunError::GuardEvaluation {
                    state: self.current.name().to_string(),
                    message,
                });
            }
        }
        self
    }

    fn ready(&self, stage: Stage) -> bool {
        if !self.trigger.enables(stage) {
            return false;
        }
        if self.stopped {
            trace!(run = %self.wiring.run, state = self.current.name(), ?stage, "pipeline stopped; skipping stage");
            return false;
        }
        true
    }

    fn fail_entry(&self, message: String) {
        warn!(run = %self.wiring.run, state = self.current.name(), error = %message, "entry action failed");
        self.wiring.settler.reject(RunError::EntryAction {
            state: self.current.name().to_string(),
            message,
        });
    }

    fn reject_no_runtime(&self, operation: &'static str) {
        warn!(run = %self.wiring.run, state = self.current.name(), operation, "no tokio runtime");
        self.wiring.settler.reject(RunError::NoRuntime {
            state: self.current.name().to_string(),
            operation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_stage_is_always_enabled() {
        let entry: Trigger<()> = Trigger::Entry;
        let event = Trigger::Event(());

        assert!(entry.enables(Stage::Guard));
        assert!(event.enables(Stage::Guard));
    }

    #[test]
    fn entry_enables_entry_and_after_only() {
        let entry: Trigger<()> = Trigger::Entry;

        assert!(entry.enables(Stage::Entry));
        assert!(entry.enables(Stage::After));
        assert!(!entry.enables(Stage::Receive));
    }

    #[test]
    fn event_enables_receive_only() {
        let event = Trigger::Event(());

        assert!(event.enables(Stage::Receive));
        assert!(!event.enables(Stage::Entry));
        assert!(!event.enables(Stage::After));
    }
}
