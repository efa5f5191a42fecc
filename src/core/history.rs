//! State transition history tracking.
//!
//! Every write to a run's state cell after its initial delivery is recorded
//! here, in the order the writes happened.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use stagehand::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum TaskState {
///     Pending,
///     Running,
/// }
///
/// impl State for TaskState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "Pending",
///             Self::Running => "Running",
///         }
///     }
/// }
///
/// let transition = StateTransition::now(TaskState::Pending, TaskState::Running);
/// assert_eq!(transition.to, TaskState::Running);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the state cell was written
    pub timestamp: DateTime<Utc>,
}

impl<S: State> StateTransition<S> {
    /// Create a transition stamped with the current time.
    pub fn now(from: S, to: S) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
        }
    }

    /// A write of the state the machine was already in.
    ///
    /// Self-transitions still re-run the state's entry pipeline.
    pub fn is_reentry(&self) -> bool {
        self.from == self.to
    }
}

/// Ordered, optionally bounded history of state transitions.
///
/// When a limit is set the oldest transitions are evicted first.
///
/// # Example
///
/// ```rust
/// use stagehand::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum WorkState {
///     Start,
///     Middle,
///     End,
/// }
///
/// impl State for WorkState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Start => "Start",
///             Self::Middle => "Middle",
///             Self::End => "End",
///         }
///     }
/// }
///
/// let mut history = StateHistory::new();
/// history.record(StateTransition::now(WorkState::Start, WorkState::Middle));
/// history.record(StateTransition::now(WorkState::Middle, WorkState::End));
///
/// let path = history.get_path();
/// assert_eq!(path.len(), 3); // Start -> Middle -> End
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: VecDeque<StateTransition<S>>,
    limit: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new, unbounded, empty history.
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    /// Create an empty history keeping at most `limit` transitions.
    ///
    /// ```rust
    /// use stagehand::core::{State, StateHistory, StateTransition};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    /// enum Step { A, B }
    ///
    /// impl State for Step {
    ///     fn name(&self) -> &str {
    ///         match self {
    ///             Self::A => "A",
    ///             Self::B => "B",
    ///         }
    ///     }
    /// }
    ///
    /// let mut history = StateHistory::with_limit(Some(2));
    /// for _ in 0..5 {
    ///     history.record(StateTransition::now(Step::A, Step::B));
    /// }
    /// assert_eq!(history.len(), 2);
    /// ```
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            transitions: VecDeque::new(),
            limit,
        }
    }

    /// Append a transition, evicting the oldest one if the limit is reached.
    pub fn record(&mut self, transition: StateTransition<S>) {
        if self.limit == Some(0) {
            return;
        }
        if let Some(limit) = self.limit {
            while self.transitions.len() >= limit {
                self.transitions.pop_front();
            }
        }
        self.transitions.push_back(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest retained transition, then the
    /// `to` state of each transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Calculate total duration from first to last retained transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Iterate over retained transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition<S>> {
        self.transitions.iter()
    }

    /// Most recent transition, if any.
    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Active,
        Cooldown,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Active => "Active",
                Self::Cooldown => "Cooldown",
            }
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history: StateHistory<TestState> = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert!(history.last().is_none());
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let mut history = StateHistory::new();
        history.record(StateTransition::now(TestState::Idle, TestState::Active));
        history.record(StateTransition::now(TestState::Active, TestState::Cooldown));

        let path = history.get_path();
        assert_eq!(
            path,
            vec![&TestState::Idle, &TestState::Active, &TestState::Cooldown]
        );
    }

    #[test]
    fn limit_evicts_oldest_first() {
        let mut history = StateHistory::with_limit(Some(2));
        history.record(StateTransition::now(TestState::Idle, TestState::Active));
        history.record(StateTransition::now(TestState::Active, TestState::Cooldown));
        history.record(StateTransition::now(TestState::Cooldown, TestState::Idle));

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.get_path(),
            vec![&TestState::Active, &TestState::Cooldown, &TestState::Idle]
        );
    }

    #[test]
    fn zero_limit_records_nothing() {
        let mut history = StateHistory::with_limit(Some(0));
        history.record(StateTransition::now(TestState::Idle, TestState::Active));
        assert!(history.is_empty());
    }

    #[test]
    fn reentry_is_detected() {
        let same = StateTransition::now(TestState::Active, TestState::Active);
        let moved = StateTransition::now(TestState::Idle, TestState::Active);

        assert!(same.is_reentry());
        assert!(!moved.is_reentry());
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let start = Utc::now();
        let mut history = StateHistory::new();
        history.record(StateTransition {
            from: TestState::Idle,
            to: TestState::Active,
            timestamp: start,
        });
        history.record(StateTransition {
            from: TestState::Active,
            to: TestState::Idle,
            timestamp: start + chrono::Duration::milliseconds(25),
        });

        assert_eq!(history.duration(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = StateHistory::with_limit(Some(8));
        history.record(StateTransition::now(TestState::Idle, TestState::Active));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<TestState> = serde_json::from_str(&json).unwrap();

        assert_eq!(history.len(), deserialized.len());
        assert_eq!(deserialized.last().map(|t| &t.to), Some(&TestState::Active));
    }
}
