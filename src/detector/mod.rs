//! Phase Transition Detector.
//!
//! Inspects the output of an executed test run and the current phase to
//! decide whether the workflow moved on:
//!
//! - `testing` + failing-test output → `implementation` (red phase)
//! - `implementation` + passing output with no nonzero failure count →
//!   `verification` (green phase)
//!
//! `verification → complete` is an orchestrator decision and never detected
//! here. Only execute actions that look like test runs are inspected.

mod patterns;

pub use patterns::{TestOutcome, classify, has_failures, is_green, is_red};

use crate::checkpoint::{Checkpoint, CheckpointStore, PutOutcome, phase_complete_name};
use crate::errors::StateError;
use crate::gate::{Action, ActionKind};
use crate::phase::WorkflowPhase;
use crate::state::{StateManager, WorkflowState};
use serde::Serialize;

/// Message attached to a red-phase transition.
pub const RED_MESSAGE: &str = "Tests written and failing as expected (red phase observed)";
/// Message attached to a green-phase transition.
pub const GREEN_MESSAGE: &str = "All tests passing (green phase observed)";

/// Command fragments that mark a test run.
const TEST_RUN_MARKERS: &[&str] = &["test", "spec", "jest", "mocha"];

/// A detected phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    pub message: String,
    /// Name of the completion checkpoint, when it was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionDetector;

impl TransitionDetector {
    /// True for execute actions whose command looks like a test run.
    pub fn is_test_run(action: &Action) -> bool {
        if action.kind != ActionKind::Execute {
            return false;
        }
        let command = action.target.to_lowercase();
        TEST_RUN_MARKERS.iter().any(|m| command.contains(m))
    }

    /// Pure decision: which transition, if any, `output` implies.
    pub fn detect(&self, phase: WorkflowPhase, action: &Action, output: &str) -> Option<Transition> {
        if !Self::is_test_run(action) {
            return None;
        }

        let (to, message) = match phase {
            WorkflowPhase::Testing if is_red(output) => (WorkflowPhase::Implementation, RED_MESSAGE),
            WorkflowPhase::Implementation if is_green(output) => {
                (WorkflowPhase::Verification, GREEN_MESSAGE)
            }
            _ => {
                tracing::debug!(%phase, outcome = ?classify(output), "no transition");
                return None;
            }
        };

        Some(Transition {
            from: phase,
            to,
            message: message.to_string(),
            checkpoint: None,
        })
    }

    /// Detect and commit: advance the State Record, then write the
    /// completion checkpoint for the finished phase.
    ///
    /// A failed state write aborts with no checkpoint. A failed checkpoint
    /// write after a committed state change is logged and tolerated; the
    /// waiting consumer then times out.
    pub fn observe(
        &self,
        states: &StateManager,
        store: &dyn CheckpointStore,
        current: &WorkflowState,
        action: &Action,
        output: &str,
    ) -> Result<Option<Transition>, StateError> {
        let Some(mut transition) = self.detect(current.phase, action, output) else {
            return Ok(None);
        };

        let state = states.advance(transition.to, true, &transition.message)?;

        let name = phase_complete_name(transition.from.as_str(), chrono::Local::now());
        let checkpoint = Checkpoint::new(
            &name,
            transition.from.canonical_role().as_str(),
            "orchestrator",
            &state.feature,
            format!(
                "Phase {} complete.\n\n{}\n\nNext phase: {}",
                transition.from, transition.message, transition.to
            ),
        )
        .with_metadata(serde_json::json!({
            "from_phase": transition.from,
            "to_phase": transition.to,
        }));

        match store.put(&name, &checkpoint.render()) {
            Ok(PutOutcome::Created) | Ok(PutOutcome::AlreadyExists) => {
                transition.checkpoint = Some(name);
            }
            Err(e) => {
                tracing::warn!(
                    feature = %state.feature,
                    error = %e,
                    "phase advanced but completion checkpoint could not be written"
                );
            }
        }

        Ok(Some(transition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::errors::CheckpointError;
    use crate::phase::Role;
    use crate::session::Session;
    use tempfile::tempdir;

    fn test_run() -> Action {
        Action::execute("npm test")
    }

    #[test]
    fn test_red_phase_scenario() {
        let detector = TransitionDetector::default();
        let t = detector
            .detect(WorkflowPhase::Testing, &test_run(), "5 tests, 5 failures")
            .unwrap();
        assert_eq!(t.to, WorkflowPhase::Implementation);
        assert!(t.message.contains("red phase"));
    }

    #[test]
    fn test_green_phase_scenario() {
        let detector = TransitionDetector::default();
        let t = detector
            .detect(WorkflowPhase::Implementation, &test_run(), "10 passing")
            .unwrap();
        assert_eq!(t.to, WorkflowPhase::Verification);
        assert!(t.message.contains("green phase"));
    }

    #[test]
    fn test_passing_cargo_summary_is_not_red() {
        let detector = TransitionDetector::default();
        let output = "running 14 tests\n\ntest result: ok. 14 passed; 0 failed; 0 ignored; 0 measured";
        assert_eq!(classify(output), TestOutcome::Green);
        assert!(
            detector
                .detect(WorkflowPhase::Testing, &Action::execute("cargo test"), output)
                .is_none()
        );
    }

    #[test]
    fn test_failure_marker_dominates_passing() {
        let detector = TransitionDetector::default();
        assert!(
            detector
                .detect(WorkflowPhase::Implementation, &test_run(), "8 passing, 2 failing")
                .is_none()
        );
    }

    #[test]
    fn test_only_test_runs_are_inspected() {
        let detector = TransitionDetector::default();
        let output = "5 tests, 5 failures";
        assert!(
            detector
                .detect(WorkflowPhase::Testing, &Action::execute("cat log.txt"), output)
                .is_none()
        );
        assert!(
            detector
                .detect(WorkflowPhase::Testing, &Action::write("tests/output.txt"), output)
                .is_none()
        );
        assert!(
            detector
                .detect(WorkflowPhase::Testing, &Action::execute("npx jest"), output)
                .is_some()
        );
    }

    #[test]
    fn test_other_phases_never_transition() {
        let detector = TransitionDetector::default();
        for phase in [
            WorkflowPhase::Planning,
            WorkflowPhase::Verification,
            WorkflowPhase::Complete,
        ] {
            assert!(detector.detect(phase, &test_run(), "5 tests, 5 failures").is_none());
            assert!(detector.detect(phase, &test_run(), "10 passing").is_none());
        }
        // Green output in testing, red output in implementation: no move.
        assert!(detector.detect(WorkflowPhase::Testing, &test_run(), "10 passing").is_none());
        assert!(
            detector
                .detect(WorkflowPhase::Implementation, &test_run(), "3 failing")
                .is_none()
        );
    }

    fn active_session(phase: WorkflowPhase) -> (tempfile::TempDir, StateManager) {
        let dir = tempdir().unwrap();
        let states = StateManager::new(&Session::for_project(dir.path()));
        states.initialize("hello").unwrap();
        let mut current = WorkflowPhase::Planning;
        while current != phase {
            current = current.next().unwrap();
            states.advance(current, false, "orchestrator").unwrap();
        }
        (dir, states)
    }

    #[test]
    fn test_observe_commits_state_and_checkpoint() {
        let (_dir, states) = active_session(WorkflowPhase::Testing);
        let store = MemoryCheckpointStore::new();
        let current = states.read().unwrap();

        let t = TransitionDetector::default()
            .observe(&states, &store, &current, &test_run(), "AssertionError: expected 1 to equal 2")
            .unwrap()
            .unwrap();

        let state = states.read().unwrap();
        assert_eq!(state.phase, WorkflowPhase::Implementation);
        assert_eq!(state.previous_phase, Some(WorkflowPhase::Testing));
        assert_eq!(state.role, Role::Implementer);
        assert!(state.phase_complete);
        assert!(state.last_transition_at.is_some());

        let name = t.checkpoint.unwrap();
        assert!(name.ends_with("_testing_complete.md"));
        let content = store.get(&name).unwrap().unwrap();
        assert!(content.contains("**From:** tester"));
        assert!(content.contains("**Feature:** hello"));
        assert!(content.contains("red phase"));
    }

    #[test]
    fn test_observe_without_transition_leaves_state() {
        let (_dir, states) = active_session(WorkflowPhase::Implementation);
        let store = MemoryCheckpointStore::new();
        let current = states.read().unwrap();

        let result = TransitionDetector::default()
            .observe(&states, &store, &current, &test_run(), "8 passing, 2 failing")
            .unwrap();
        assert!(result.is_none());
        assert_eq!(states.read().unwrap(), current);
        assert!(store.list().unwrap().is_empty());
    }

    struct BrokenStore;

    impl CheckpointStore for BrokenStore {
        fn put(&self, name: &str, _content: &str) -> Result<PutOutcome, CheckpointError> {
            Err(CheckpointError::Io {
                path: name.into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn list(&self) -> Result<Vec<String>, CheckpointError> {
            Ok(Vec::new())
        }

        fn get(&self, _name: &str) -> Result<Option<String>, CheckpointError> {
            Ok(None)
        }
    }

    #[test]
    fn test_observe_tolerates_checkpoint_failure() {
        let (_dir, states) = active_session(WorkflowPhase::Implementation);
        let current = states.read().unwrap();

        let t = TransitionDetector::default()
            .observe(&states, &BrokenStore, &current, &test_run(), "All tests passed")
            .unwrap()
            .unwrap();
        assert!(t.checkpoint.is_none());
        assert_eq!(states.read().unwrap().phase, WorkflowPhase::Verification);
    }

    #[test]
    fn test_observe_with_stale_snapshot_does_not_skip() {
        let (_dir, states) = active_session(WorkflowPhase::Testing);
        let stale = states.read().unwrap();
        // Another process already moved the workflow on.
        states
            .advance(WorkflowPhase::Implementation, true, "red phase observed")
            .unwrap();

        let err = TransitionDetector::default()
            .observe(&states, &MemoryCheckpointStore::new(), &stale, &test_run(), "2 failing")
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
        assert_eq!(states.read().unwrap().phase, WorkflowPhase::Implementation);
    }
}
