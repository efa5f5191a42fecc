//! Macros for ergonomic machine construction.

/// Generate a State trait implementation for simple enums.
///
/// # Example
///
/// ```
/// use stagehand::state_enum;
/// use stagehand::core::State;
///
/// state_enum! {
///     pub enum WorkflowState {
///         Start,
///         Processing,
///         Done,
///     }
/// }
///
/// assert_eq!(WorkflowState::Processing.name(), "Processing");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

/// Generate an Event trait implementation for enums whose variants carry
/// optional tuple payloads. The event name is the variant name.
///
/// # Example
///
/// ```
/// use stagehand::event_enum;
/// use stagehand::core::Event;
///
/// event_enum! {
///     pub enum Input {
///         Increment,
///         Add(u32),
///         Rename(String, bool),
///     }
/// }
///
/// assert_eq!(Input::Add(2).name(), "Add");
/// assert_eq!(Input::Increment.name(), "Increment");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( ( $($payload:ty),+ $(,)? ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $( ( $($payload),+ ) )?
            ),*
        }

        impl $crate::core::Event for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}
