//! Checkpoint Monitor: the producer/consumer facade used by workers.
//!
//! Producers call [`CheckpointMonitor::create`]; consumers block in
//! [`CheckpointMonitor::wait_for`] until a matching record appears or the
//! timeout elapses. Polling backs off multiplicatively from the initial
//! interval up to a cap, so detection latency is bounded by the cap once the
//! wait has settled.

use super::store::compile_pattern;
use super::{Checkpoint, CheckpointStore, Clock, FsCheckpointStore, PutOutcome, SystemClock};
use crate::config::MonitorConfig;
use crate::errors::CheckpointError;
use crate::phase::Role;
use crate::session::Session;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Multiplicative backoff with a ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    factor: f64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial.min(max),
            max,
            factor: factor.max(1.0),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.initial_interval(),
            config.max_interval(),
            config.backoff_factor,
        )
    }

    /// The delay to use now; grows the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let grown = (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64());
        self.current = Duration::try_from_secs_f64(grown).unwrap_or(self.max);
        delay
    }
}

/// When the "still waiting" report is next due during a wait.
#[derive(Debug, Clone)]
struct ProgressSchedule {
    every: Duration,
    next: Duration,
}

impl ProgressSchedule {
    fn new(every: Duration) -> Self {
        Self { every, next: every }
    }

    /// True once per elapsed period; a zero period never reports.
    fn due(&mut self, elapsed: Duration) -> bool {
        if self.every.is_zero() || elapsed < self.next {
            return false;
        }
        while self.next <= elapsed {
            self.next += self.every;
        }
        true
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

/// Introspection snapshot for the `info` command.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub feature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,
    pub checkpoints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_run: Option<String>,
}

pub struct CheckpointMonitor {
    store: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    feature: String,
    role: Role,
    backoff: Backoff,
    progress_every: Duration,
    session: Option<Session>,
}

impl CheckpointMonitor {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        clock: Arc<dyn Clock>,
        feature: impl Into<String>,
        role: Role,
    ) -> Self {
        let defaults = MonitorConfig::default();
        Self {
            store,
            clock,
            feature: feature.into(),
            role,
            backoff: Backoff::from_config(&defaults),
            progress_every: defaults.progress_every(),
            session: None,
        }
    }

    /// Monitor over the session's checkpoint directory for `feature`.
    pub fn for_session(session: &Session, feature: &str, role: Role, config: &MonitorConfig) -> Self {
        let store = FsCheckpointStore::new(session.checkpoint_dir(feature));
        let mut monitor = Self::new(Arc::new(store), Arc::new(SystemClock), feature, role)
            .with_config(config);
        monitor.session = Some(session.clone());
        monitor
    }

    pub fn with_config(mut self, config: &MonitorConfig) -> Self {
        self.backoff = Backoff::from_config(config);
        self.progress_every = config.progress_every();
        self
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Format a record from this worker and store it under `name`.
    pub fn create(
        &self,
        name: &str,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<PutOutcome, CheckpointError> {
        let mut checkpoint = Checkpoint::new(
            name,
            self.role.as_str(),
            self.role.recipient_label(),
            &self.feature,
            content,
        );
        if let Some(metadata) = metadata {
            checkpoint = checkpoint.with_metadata(metadata);
        }

        let outcome = self.store.put(name, &checkpoint.render())?;
        match outcome {
            PutOutcome::Created => tracing::info!(name, role = %self.role, "created checkpoint"),
            PutOutcome::AlreadyExists => {
                tracing::info!(name, "checkpoint already exists; left unchanged")
            }
        }
        Ok(outcome)
    }

    /// Block until a checkpoint matching `pattern` exists; return its content.
    ///
    /// The first match in lexicographic order wins. Fails with
    /// `CheckpointError::Timeout` once `timeout` has elapsed without a match.
    pub async fn wait_for(&self, pattern: &str, timeout: Duration) -> Result<String, CheckpointError> {
        compile_pattern(pattern)?;

        let start = self.clock.now();
        let mut backoff = self.backoff.clone();
        let mut progress = ProgressSchedule::new(self.progress_every);
        let mut reports = 0u32;

        tracing::info!(pattern, timeout_secs = timeout.as_secs(), "waiting for checkpoint");

        loop {
            if let Some((name, content)) = self.poll(pattern) {
                tracing::info!(name = %name, "found checkpoint");
                return Ok(content);
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= timeout {
                let err = CheckpointError::Timeout {
                    pattern: pattern.to_string(),
                    waited: elapsed,
                };
                tracing::error!("{}", err);
                return Err(err);
            }

            if progress.due(elapsed) {
                reports += 1;
                tracing::info!(pattern, elapsed_secs = elapsed.as_secs(), reports, "still waiting");
            }

            let delay = backoff.next_delay().min(timeout - elapsed);
            tracing::debug!(pattern, delay_ms = delay.as_millis() as u64, "no match yet");
            self.clock.sleep(delay).await;
        }
    }

    /// One check of the store. Store errors count as "not yet".
    fn poll(&self, pattern: &str) -> Option<(String, String)> {
        let matches = match self.store.match_glob(pattern) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "checkpoint listing failed; retrying");
                return None;
            }
        };

        let name = matches.into_iter().next()?;
        match self.store.get(&name) {
            Ok(Some(content)) => Some((name, content)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "checkpoint read failed; retrying");
                None
            }
        }
    }

    pub fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let names = self.store.list()?;
        tracing::debug!(count = names.len(), "listed checkpoints");
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Result<Option<String>, CheckpointError> {
        let content = self.store.get(name)?;
        if content.is_none() {
            tracing::debug!(name, "checkpoint not found");
        }
        Ok(content)
    }

    pub fn info(&self) -> Result<RunInfo, CheckpointError> {
        let checkpoints = self.list()?;
        let (run_dir, log_file, previous_run) = match self.session {
            Some(ref session) => {
                let previous = std::fs::read_to_string(session.previous_run_file(&self.feature))
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                (
                    Some(session.run_dir(&self.feature)),
                    Some(session.role_log_file(&self.feature, self.role.as_str())),
                    previous,
                )
            }
            None => (None, None, None),
        };

        Ok(RunInfo {
            feature: self.feature.clone(),
            run_dir,
            checkpoints,
            log_file,
            previous_run,
        })
    }
}
