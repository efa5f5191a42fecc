//! Events delivered to a running machine.

use std::fmt::Debug;

/// Trait for machine events.
///
/// An event is a name plus an optional payload. In Rust the payload rides
/// inside the value itself (usually an enum variant's fields), and `name`
/// selects the receiver in a state's `on_receive` map.
///
/// Events used only by a state's own entry actions ("local" events) are
/// declared the same way; the runtime makes no distinction.
///
/// # Example
///
/// ```rust
/// use stagehand::core::Event;
///
/// #[derive(Clone, Debug)]
/// enum Cart {
///     Add(u32),
///     Clear,
/// }
///
/// impl Event for Cart {
///     fn name(&self) -> &str {
///         match self {
///             Self::Add(_) => "Add",
///             Self::Clear => "Clear",
///         }
///     }
/// }
///
/// assert_eq!(Cart::Add(3).name(), "Add");
/// ```
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// Get the event's name, used to look up its receiver.
    fn name(&self) -> &str;
}
