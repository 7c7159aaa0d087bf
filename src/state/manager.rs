use super::{StatePatch, WorkflowState};
use crate::errors::StateError;
use crate::phase::WorkflowPhase;
use crate::session::Session;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes the State Record for one session.
pub struct StateManager {
    state_file: PathBuf,
}

impl StateManager {
    pub fn new(session: &Session) -> Self {
        Self {
            state_file: session.state_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }

    /// Current record, or `None` when no session is active.
    ///
    /// A missing file, an unreadable file and an unparseable document all
    /// read as `None`; callers retry rather than fail.
    pub fn read(&self) -> Option<WorkflowState> {
        let content = match fs::read_to_string(&self.state_file) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.state_file.display(), error = %e, "state record unreadable");
                }
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::debug!(path = %self.state_file.display(), error = %e, "state record malformed");
                None
            }
        }
    }

    /// Create a fresh record for `feature`, superseding any existing one.
    pub fn initialize(&self, feature: &str) -> Result<WorkflowState, StateError> {
        let state = WorkflowState::new(feature);
        self.write(&state)?;
        tracing::info!(feature, "session initialized");
        Ok(state)
    }

    /// Read-modify-write: merge `patch` into the current record.
    ///
    /// Nothing is mutated on disk unless the whole new document is written.
    pub fn update(&self, patch: &StatePatch) -> Result<WorkflowState, StateError> {
        let mut state = self.read().ok_or(StateError::NoSession)?;
        state.apply(patch);
        self.write(&state)?;
        Ok(state)
    }

    /// Move one step forward along the phase sequence.
    ///
    /// `phase_complete` is true for detector-driven transitions and false
    /// when the orchestrator starts the next phase.
    pub fn advance(
        &self,
        to: WorkflowPhase,
        phase_complete: bool,
        trigger: &str,
    ) -> Result<WorkflowState, StateError> {
        let current = self.read().ok_or(StateError::NoSession)?;
        let from = current.phase;
        if !from.can_advance_to(to) {
            return Err(StateError::InvalidTransition { from, to });
        }

        let state = self.update(&StatePatch::transition(from, to, phase_complete, trigger))?;
        tracing::info!(feature = %state.feature, %from, %to, trigger, "phase transition");
        Ok(state)
    }

    /// End the session by removing the record.
    pub fn clear(&self) -> Result<bool, StateError> {
        match fs::remove_file(&self.state_file) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StateError::WriteFailed {
                path: self.state_file.clone(),
                source,
            }),
        }
    }

    /// Replace the whole document: write a sibling temp file, then rename.
    fn write(&self, state: &WorkflowState) -> Result<(), StateError> {
        let parent = self
            .state_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).map_err(|source| StateError::ResolveFailed {
            path: parent.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(state)?;
        let tmp = parent.join(format!(".state.{}.tmp", std::process::id()));

        let result = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.state_file));
        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            tracing::warn!(path = %self.state_file.display(), error = %source, "state write failed");
            return Err(StateError::WriteFailed {
                path: self.state_file.clone(),
                source,
            });
        }
        Ok(())
    }
}
