//! Append-only checkpoint storage.
//!
//! Records are never edited or deleted here. `put` on an existing name is a
//! successful no-op. Listing and glob matching always re-read the backing
//! store because other processes write to it concurrently.

use super::is_valid_name;
use crate::errors::CheckpointError;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Result of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// A record with this name was already present; nothing was written
    AlreadyExists,
}

/// A directory-scoped collection of named, immutable records.
pub trait CheckpointStore: Send + Sync {
    /// Store `content` under `name` unless the name is already taken.
    fn put(&self, name: &str, content: &str) -> Result<PutOutcome, CheckpointError>;

    /// Names present right now, sorted lexicographically.
    fn list(&self) -> Result<Vec<String>, CheckpointError>;

    /// Content of `name`, or `None` if it does not exist.
    fn get(&self, name: &str) -> Result<Option<String>, CheckpointError>;

    /// Names present right now that match a shell-style glob, sorted.
    fn match_glob(&self, pattern: &str) -> Result<Vec<String>, CheckpointError> {
        let compiled = compile_pattern(pattern)?;
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| compiled.matches_with(name, match_options()))
            .collect())
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, CheckpointError> {
    Pattern::new(pattern).map_err(|source| CheckpointError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    }
}

fn check_name(name: &str) -> Result<(), CheckpointError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(CheckpointError::InvalidName(name.to_string()))
    }
}

/// Checkpoints as plain files in one directory.
#[derive(Debug, Clone)]
pub struct FsCheckpointStore {
    dir: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl CheckpointStore for FsCheckpointStore {
    fn put(&self, name: &str, content: &str) -> Result<PutOutcome, CheckpointError> {
        check_name(name)?;
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_err(&self.dir, e))?;

        let target = self.dir.join(name);
        if target.exists() {
            return Ok(PutOutcome::AlreadyExists);
        }

        // Write under a hidden name, then hard-link into place: readers never
        // see a partial record and the link fails if the name was taken.
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", name, std::process::id()));
        fs::write(&tmp, content).map_err(|e| Self::io_err(&tmp, e))?;
        let linked = fs::hard_link(&tmp, &target);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => Ok(PutOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(PutOutcome::AlreadyExists),
            Err(e) => Err(Self::io_err(&target, e)),
        }
    }

    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&self.dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();

        names.sort();
        Ok(names)
    }

    fn get(&self, name: &str) -> Result<Option<String>, CheckpointError> {
        check_name(name)?;
        let path = self.dir.join(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(&path, e)),
        }
    }
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    records: Mutex<BTreeMap<String, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned map still holds only complete inserts.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn put(&self, name: &str, content: &str) -> Result<PutOutcome, CheckpointError> {
        check_name(name)?;
        let mut records = self.records();
        if records.contains_key(name) {
            return Ok(PutOutcome::AlreadyExists);
        }
        records.insert(name.to_string(), content.to_string());
        Ok(PutOutcome::Created)
    }

    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self.records().keys().cloned().collect())
    }

    fn get(&self, name: &str) -> Result<Option<String>, CheckpointError> {
        check_name(name)?;
        Ok(self.records().get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise_store(store: &dyn CheckpointStore) {
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.get("001-init.md").unwrap(), None);

        assert_eq!(store.put("002-tests.md", "tests").unwrap(), PutOutcome::Created);
        assert_eq!(store.put("001-init.md", "init").unwrap(), PutOutcome::Created);
        assert_eq!(store.put("010-done.txt", "done").unwrap(), PutOutcome::Created);

        assert_eq!(
            store.list().unwrap(),
            vec!["001-init.md", "002-tests.md", "010-done.txt"]
        );
        assert_eq!(store.get("002-tests.md").unwrap().as_deref(), Some("tests"));
        assert_eq!(
            store.match_glob("00?-*.md").unwrap(),
            vec!["001-init.md", "002-tests.md"]
        );
        assert!(store.match_glob("*verification*").unwrap().is_empty());
    }

    #[test]
    fn test_fs_store_contract() {
        let dir = tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path().join("checkpoints"));
        exercise_store(&store);
    }

    #[test]
    fn test_memory_store_contract() {
        exercise_store(&MemoryCheckpointStore::new());
    }

    #[test]
    fn test_fs_put_is_idempotent_by_name() {
        let dir = tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path());
        store.put("001-init.md", "first").unwrap();
        assert_eq!(
            store.put("001-init.md", "second").unwrap(),
            PutOutcome::AlreadyExists
        );
        assert_eq!(store.get("001-init.md").unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_memory_put_is_idempotent_by_name() {
        let store = MemoryCheckpointStore::new();
        store.put("a.md", "first").unwrap();
        assert_eq!(store.put("a.md", "second").unwrap(), PutOutcome::AlreadyExists);
        assert_eq!(store.get("a.md").unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_fs_put_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("feature/runs/current/checkpoints");
        let store = FsCheckpointStore::new(&nested);
        store.put("001.md", "x").unwrap();
        assert!(nested.join("001.md").is_file());
    }

    #[test]
    fn test_fs_list_skips_hidden_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".001-init.md.42.tmp"), "partial").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("001-init.md"), "x").unwrap();

        let store = FsCheckpointStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["001-init.md"]);
    }

    #[test]
    fn test_fs_list_reflects_external_writes() {
        let dir = tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path());
        assert!(store.match_glob("*.md").unwrap().is_empty());

        fs::write(dir.path().join("003-verified.md"), "ok").unwrap();
        assert_eq!(store.match_glob("*.md").unwrap(), vec!["003-verified.md"]);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let store = MemoryCheckpointStore::new();
        assert!(matches!(
            store.put("../x.md", "x"),
            Err(CheckpointError::InvalidName(_))
        ));
        assert!(matches!(
            store.get("a/b.md"),
            Err(CheckpointError::InvalidName(_))
        ));
    }

    #[test]
    fn test_invalid_glob_is_reported() {
        let store = MemoryCheckpointStore::new();
        let err = store.match_glob("[unclosed").unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidPattern { .. }));
    }
}
