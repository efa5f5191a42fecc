//! One-shot completion signal for a run.

use crate::runtime::error::RunError;
use crate::runtime::run::RunId;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

type Outcome = Result<(), RunError>;

/// Settling side of the signal, shared by every pipeline of a run.
///
/// The first settle wins; later attempts are ignored.
#[derive(Clone)]
pub(crate) struct Settler {
    run: RunId,
    tx: Arc<watch::Sender<Option<Outcome>>>,
}

impl Settler {
    pub(crate) fn new(run: RunId) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            run,
            tx: Arc::new(tx),
        }
    }

    pub(crate) fn resolve(&self) -> bool {
        self.settle(Ok(()))
    }

    pub(crate) fn reject(&self, error: RunError) -> bool {
        self.settle(Err(error))
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub(crate) fn completion(&self) -> Completion {
        Completion {
            rx: self.tx.subscribe(),
        }
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let mut pending = Some(outcome);
        let settled = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = pending.take();
            true
        });
        if let Some(ignored) = pending {
            debug!(run = %self.run, outcome = ?ignored, "completion already settled; ignoring");
        }
        settled
    }
}

/// Observing side of a run's completion signal.
///
/// Resolves with `Ok(())` when an event handler returns
/// [`Next::End`](crate::runtime::Next::End), and with an error when a guard
/// or entry action fails. Cloneable; every clone sees the same outcome.
///
/// `Completion` can be awaited directly:
///
/// ```rust,no_run
/// # async fn wait(run: stagehand::runtime::Completion) {
/// match run.await {
///     Ok(()) => println!("terminated"),
///     Err(error) => eprintln!("failed: {error}"),
/// }
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Completion {
    rx: watch::Receiver<Option<Outcome>>,
}

impl Completion {
    /// The outcome, if the run has settled.
    pub fn outcome(&self) -> Option<Result<(), RunError>> {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the run to settle.
    ///
    /// Returns [`RunError::Abandoned`] if the run is dropped first.
    pub async fn wait(&self) -> Result<(), RunError> {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| RunError::Abandoned)?;
        let outcome = (*settled).clone();
        outcome.unwrap_or(Err(RunError::Abandoned))
    }
}

impl IntoFuture for Completion {
    type Output = Result<(), RunError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_error() -> RunError {
        RunError::GuardEvaluation {
            state: "Active".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn first_settle_wins() {
        let settler = Settler::new(RunId::new());
        let completion = settler.completion();

        assert!(settler.reject(guard_error()));
        assert!(!settler.resolve());
        assert!(!settler.reject(RunError::Abandoned));

        assert_eq!(completion.outcome(), Some(Err(guard_error())));
    }

    #[test]
    fn completion_created_after_settle_sees_outcome() {
        let settler = Settler::new(RunId::new());
        settler.resolve();

        let completion = settler.completion();
        assert!(completion.is_settled());
        assert_eq!(completion.outcome(), Some(Ok(())));
    }

    #[tokio::test]
    async fn wait_returns_once_settled() {
        let settler = Settler::new(RunId::new());
        let completion = settler.completion();

        let waiter = tokio::spawn(completion.clone().into_future());
        settler.resolve();

        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn dropping_the_settler_abandons_waiters() {
        let settler = Settler::new(RunId::new());
        let completion = settler.completion();
        drop(settler);

        assert_eq!(completion.wait().await, Err(RunError::Abandoned));
    }

    #[tokio::test]
    async fn settled_outcome_survives_settler_drop() {
        let settler = Settler::new(RunId::new());
        let completion = settler.completion();
        settler.reject(guard_error());
        drop(settler);

        assert_eq!(completion.await, Err(guard_error()));
    }
}
