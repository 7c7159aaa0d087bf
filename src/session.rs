//! Session handle: resolves every path the coordination core touches.
//!
//! A `Session` is passed explicitly to each component instead of having
//! components look up a fixed "current" location on their own, so several
//! sessions can coexist (one per temp root in tests).
//!
//! Layout under the coordination root (default `<project>/.tmops`):
//!
//! ```text
//! .tmops/
//!   config.toml
//!   current/state.json                 # State Record (activation signal)
//!   <feature>/runs/<run>/checkpoints/  # Checkpoint Store
//!   <feature>/runs/<run>/logs/         # per-role logs, subagent events
//!   <feature>/runs/<run>/PREVIOUS_RUN.txt
//! ```

use std::path::{Path, PathBuf};

/// Name of the coordination directory inside a project.
pub const COORD_DIR: &str = ".tmops";

/// Run label used when none is given.
pub const DEFAULT_RUN: &str = "current";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    root: PathBuf,
    run: String,
}

impl Session {
    /// Create a session rooted at an explicit coordination directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run: DEFAULT_RUN.to_string(),
        }
    }

    /// Create a session for a project directory (`<project>/.tmops`).
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::new(project_dir.as_ref().join(COORD_DIR))
    }

    /// Use a run label other than `current`.
    pub fn with_run(mut self, run: impl Into<String>) -> Self {
        self.run = run.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path of the State Record. Its presence switches the core on.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("current").join("state.json")
    }

    pub fn is_active(&self) -> bool {
        self.state_path().is_file()
    }

    pub fn feature_dir(&self, feature: &str) -> PathBuf {
        self.root.join(feature)
    }

    pub fn run_dir(&self, feature: &str) -> PathBuf {
        self.feature_dir(feature).join("runs").join(&self.run)
    }

    pub fn checkpoint_dir(&self, feature: &str) -> PathBuf {
        self.run_dir(feature).join("checkpoints")
    }

    pub fn log_dir(&self, feature: &str) -> PathBuf {
        self.run_dir(feature).join("logs")
    }

    pub fn role_log_file(&self, feature: &str, role: &str) -> PathBuf {
        self.log_dir(feature).join(format!("{}.log", role))
    }

    pub fn events_file(&self, feature: &str) -> PathBuf {
        self.log_dir(feature).join("subagent_events.jsonl")
    }

    pub fn previous_run_file(&self, feature: &str) -> PathBuf {
        self.run_dir(feature).join("PREVIOUS_RUN.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_for_project() {
        let session = Session::for_project("/work/proj");
        assert_eq!(session.root(), Path::new("/work/proj/.tmops"));
        assert_eq!(
            session.state_path(),
            PathBuf::from("/work/proj/.tmops/current/state.json")
        );
        assert_eq!(
            session.checkpoint_dir("hello"),
            PathBuf::from("/work/proj/.tmops/hello/runs/current/checkpoints")
        );
        assert_eq!(
            session.role_log_file("hello", "tester"),
            PathBuf::from("/work/proj/.tmops/hello/runs/current/logs/tester.log")
        );
    }

    #[test]
    fn test_with_run_changes_run_dir_only() {
        let session = Session::new("/r").with_run("002-retry");
        assert_eq!(session.run(), "002-retry");
        assert_eq!(session.run_dir("f"), PathBuf::from("/r/f/runs/002-retry"));
        assert_eq!(session.state_path(), PathBuf::from("/r/current/state.json"));
    }

    #[test]
    fn test_inactive_without_state_record() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::for_project(dir.path());
        assert!(!session.is_active());

        std::fs::create_dir_all(session.state_path().parent().unwrap()).unwrap();
        std::fs::write(session.state_path(), "{}").unwrap();
        assert!(session.is_active());
    }
}
