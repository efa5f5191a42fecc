//! Return-type adapters for guards and entry actions.
//!
//! Guards and entry actions may be infallible or fallible. These traits let
//! the pipeline accept both shapes through one method:
//!
//! ```rust
//! use stagehand::core::{ActionResult, GuardResult};
//!
//! assert_eq!(true.into_verdict(), Ok(true));
//! assert_eq!(Err::<bool, _>("bad input").into_verdict(), Err("bad input".to_string()));
//! assert_eq!(().into_outcome(), Ok(()));
//! ```

use std::fmt::Display;

/// Value returned by a guard predicate.
pub trait GuardResult {
    /// `Ok(passed)` when evaluation succeeded, `Err(message)` when it failed.
    fn into_verdict(self) -> Result<bool, String>;
}

impl GuardResult for bool {
    fn into_verdict(self) -> Result<bool, String> {
        Ok(self)
    }
}

impl<E: Display> GuardResult for Result<bool, E> {
    fn into_verdict(self) -> Result<bool, String> {
        self.map_err(|e| e.to_string())
    }
}

/// Value returned by an entry action, sync or async.
pub trait ActionResult {
    fn into_outcome(self) -> Result<(), String>;
}

impl ActionResult for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: Display> ActionResult for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Overdrawn(i64);

    impl Display for Overdrawn {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "balance {} below zero", self.0)
        }
    }

    #[test]
    fn plain_bool_is_a_verdict() {
        assert_eq!(false.into_verdict(), Ok(false));
    }

    #[test]
    fn guard_error_is_rendered_with_display() {
        let result: Result<bool, Overdrawn> = Err(Overdrawn(-5));
        assert_eq!(
            result.into_verdict(),
            Err("balance -5 below zero".to_string())
        );
    }

    #[test]
    fn fallible_action_keeps_success() {
        let ok: Result<(), String> = Ok(());
        assert_eq!(ok.into_outcome(), Ok(()));

        let failed: Result<(), Overdrawn> = Err(Overdrawn(-1));
        assert_eq!(
            failed.into_outcome(),
            Err("balance -1 below zero".to_string())
        );
    }
}
