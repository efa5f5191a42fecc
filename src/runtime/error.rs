//! Errors that settle a run's completion signal.

use thiserror::Error;

/// Reason a run's completion signal was rejected.
///
/// Failures never surface synchronously from `emit` or `start`; they are
/// only observable through [`Completion`](crate::runtime::Completion).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("Guard evaluation failed in state '{state}': {message}")]
    GuardEvaluation { state: String, message: String },

    #[error("Entry action failed in state '{state}': {message}")]
    EntryAction { state: String, message: String },

    #[error("No tokio runtime available to run {operation} in state '{state}'")]
    NoRuntime {
        state: String,
        operation: &'static str,
    },

    #[error("Re-entry depth limit ({limit}) exceeded while entering state '{state}'")]
    ReentryDepthExceeded { state: String, limit: usize },

    #[error("Run was dropped before it settled")]
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_state() {
        let error = RunError::GuardEvaluation {
            state: "Active".to_string(),
            message: "count unavailable".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Guard evaluation failed in state 'Active': count unavailable"
        );
    }

    #[test]
    fn depth_error_reports_limit() {
        let error = RunError::ReentryDepthExceeded {
            state: "Retry".to_string(),
            limit: 16,
        };

        assert!(error.to_string().contains("(16)"));
    }
}
