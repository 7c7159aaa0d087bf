//! Typed error hierarchy for the coordination core.
//!
//! Two top-level enums cover the two stores:
//! - `StateError`: State Record reads, writes and transitions
//! - `CheckpointError`: Checkpoint Store and Monitor failures
//!
//! Absence of a session and absence of a checkpoint are not errors; they are
//! reported as `None` by the respective readers.

use crate::phase::WorkflowPhase;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from the State Record.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("No active session (state record absent or unreadable)")]
    NoSession,

    #[error("Failed to write state record at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve session directory {path}: {source}")]
    ResolveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid phase transition {from} -> {to}")]
    InvalidTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },

    #[error("Failed to serialize state record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the checkpoint channel.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Timeout: no checkpoint matching {pattern} after {}s", .waited.as_secs())]
    Timeout { pattern: String, waited: Duration },

    #[error("Checkpoint I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid checkpoint pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Invalid checkpoint name '{0}'")]
    InvalidName(String),
}

impl CheckpointError {
    /// True for the distinguishable "phase did not complete in time" failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckpointError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_write_failed_carries_path() {
        let path = PathBuf::from("/tmp/.tmops/current/state.json");
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = StateError::WriteFailed {
            path: path.clone(),
            source: io_err,
        };
        match &err {
            StateError::WriteFailed { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected WriteFailed"),
        }
        assert!(err.to_string().contains("state.json"));
    }

    #[test]
    fn state_error_invalid_transition_names_phases() {
        let err = StateError::InvalidTransition {
            from: WorkflowPhase::Testing,
            to: WorkflowPhase::Complete,
        };
        let msg = err.to_string();
        assert!(msg.contains("testing"));
        assert!(msg.contains("complete"));
    }

    #[test]
    fn checkpoint_timeout_is_distinguishable() {
        let err = CheckpointError::Timeout {
            pattern: "001-*.md".to_string(),
            waited: Duration::from_secs(300),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("001-*.md"));
        assert!(err.to_string().contains("300s"));

        let other = CheckpointError::InvalidName("../x".to_string());
        assert!(!other.is_timeout());
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&StateError::NoSession);
        assert_std_error(&CheckpointError::InvalidName("x".into()));
    }
}
