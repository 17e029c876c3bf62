use thiserror::Error;

use crate::engine::RunState;

/// Top-level error type returned by the engine.
///
/// Only conditions that leave no usable result end up here. Rule failures and
/// unreadable units are recorded inside `AnalysisResult` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source model could not be loaded: {0}")]
    FatalLoad(#[source] SourceError),

    #[error("analysis cancelled by caller")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunState, to: RunState },
}

/// Errors raised by a source model adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The model as a whole cannot be obtained.
    #[error("source model unavailable: {reason}")]
    Unavailable { reason: String },

    /// A single compilation unit cannot supply its tree.
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Errors produced inside a rule's `analyze` call.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule observed cancellation")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Invalid configuration data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid literal pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_load_mentions_reason() {
        let err = EngineError::FatalLoad(SourceError::Unavailable {
            reason: "solution file missing".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("could not be loaded"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unreadable_display() {
        let err = SourceError::Unreadable {
            path: "src/a.cs".into(),
            reason: "invalid utf-8".into(),
        };
        assert_eq!(err.to_string(), "failed to read src/a.cs: invalid utf-8");
    }

    #[test]
    fn rule_error_from_anyhow_is_transparent() {
        let err: RuleError = anyhow::anyhow!("tree shape unexpected").into();
        assert_eq!(err.to_string(), "tree shape unexpected");
    }

    #[test]
    fn config_error_wraps_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(err.to_string().starts_with("invalid configuration document"));
    }

    #[test]
    fn invalid_transition_display() {
        let err = EngineError::InvalidTransition {
            from: RunState::Complete,
            to: RunState::Running,
        };
        assert_eq!(
            err.to_string(),
            "invalid run state transition: Complete -> Running"
        );
    }
}
