//! Core State trait for state machine states.
//!
//! A state is one named phase of a machine. Its name is the key the runtime
//! uses to find the state's handler, so two values with the same name share
//! a handler.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Clone`: States are copied out of the state cell on every read
/// - `PartialEq`: Delayed transitions compare the current state with the
///   state captured when they were armed
/// - `Debug`: States must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: Transition history is serializable
/// - `Send` + `Sync` + `'static`: Timer tasks carry states across threads
///
/// # Example
///
/// ```rust
/// use stagehand::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Open,
///     Closed,
///     Locked,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///             Self::Locked => "Locked",
///         }
///     }
/// }
///
/// assert_eq!(Door::Locked.name(), "Locked");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name.
    ///
    /// Used as the handler-table key, as the graph node id and in log records.
    fn name(&self) -> &str;
}
