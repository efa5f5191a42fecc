//! Per-run configuration.

use crate::builder::BuildError;
use serde::{Deserialize, Serialize};

/// Transitions kept by a run's history unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Settings applied to a single run.
///
/// Missing fields take their defaults when deserializing:
///
/// ```rust
/// use stagehand::runtime::RunConfig;
///
/// let config = RunConfig::from_json(r#"{ "max_reentry_depth": 32 }"#).unwrap();
/// assert_eq!(config.max_reentry_depth, Some(32));
/// assert_eq!(config.history_limit, RunConfig::default().history_limit);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Deepest allowed chain of synchronously nested entry pipelines.
    ///
    /// A guard whose fallback state fails its own guard re-enters the
    /// pipeline on the same call stack. `None` leaves this unbounded.
    pub max_reentry_depth: Option<usize>,

    /// Transitions retained in the run's history. `None` keeps all of them.
    pub history_limit: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_reentry_depth: None,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_reentry_depth(mut self, depth: usize) -> Self {
        self.max_reentry_depth = Some(depth);
        self
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_reentry_unbounded() {
        let config = RunConfig::default();
        assert_eq!(config.max_reentry_depth, None);
        assert_eq!(config.history_limit, Some(DEFAULT_HISTORY_LIMIT));
    }

    #[test]
    fn empty_object_yields_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn explicit_null_disables_history_limit() {
        let config = RunConfig::from_json(r#"{ "history_limit": null }"#).unwrap();
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let result = RunConfig::from_json(r#"{ "max_reentry_depth": "deep" }"#);
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn setters_chain() {
        let config = RunConfig::default()
            .with_max_reentry_depth(8)
            .with_history_limit(None);

        assert_eq!(config.max_reentry_depth, Some(8));
        assert_eq!(config.history_limit, None);
    }
}
