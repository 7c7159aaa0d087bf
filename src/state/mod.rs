//! State Record: the single authoritative phase/role document.
//!
//! The record lives at [`crate::session::Session::state_path`]. Its presence
//! is the master switch for the whole core: when it is absent (or cannot be
//! parsed) every other component passes actions through unchanged.
//!
//! Mutation is read-modify-write through [`StateManager::update`], which
//! merges a [`StatePatch`] into the current record and replaces the whole
//! document. Concurrent updates are last-writer-wins.

mod manager;

pub use manager::StateManager;

use crate::phase::{Role, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps in the record: RFC 3339, or a naive ISO datetime read as
/// local time (older hook scripts wrote those).
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        let naive = raw.parse::<NaiveDateTime>().ok()?;
        Some(
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|at| at.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
        }
    }
}

/// One committed phase change, kept in the record for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub at: DateTime<Utc>,
    /// What caused the transition (e.g. "red phase observed", "orchestrator")
    #[serde(default)]
    pub trigger: String,
}

/// The live workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub feature: String,
    #[serde(default)]
    pub phase: WorkflowPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_phase: Option<WorkflowPhase>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phase_complete: bool,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        rename = "last_transition",
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionRecord>,
    /// Fields written by other tools; preserved across updates
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowState {
    /// A fresh record: planning phase, orchestrator role.
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            phase: WorkflowPhase::Planning,
            previous_phase: None,
            role: Role::Orchestrator,
            phase_complete: false,
            started_at: Utc::now(),
            last_transition_at: None,
            transitions: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Age of the session relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }

    /// Merge the supplied fields, leaving the rest untouched.
    pub fn apply(&mut self, patch: &StatePatch) {
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(previous) = patch.previous_phase {
            self.previous_phase = Some(previous);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(complete) = patch.phase_complete {
            self.phase_complete = complete;
        }
        if let Some(at) = patch.last_transition_at {
            self.last_transition_at = Some(at);
        }
        if let Some(ref record) = patch.transition {
            self.transitions.push(record.clone());
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A partial update to a [`WorkflowState`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub phase: Option<WorkflowPhase>,
    pub previous_phase: Option<WorkflowPhase>,
    pub role: Option<Role>,
    pub phase_complete: Option<bool>,
    pub last_transition_at: Option<DateTime<Utc>>,
    pub transition: Option<TransitionRecord>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: WorkflowPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn phase_complete(mut self, complete: bool) -> Self {
        self.phase_complete = Some(complete);
        self
    }

    pub fn last_transition_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_transition_at = Some(at);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The full patch for a forward transition `from → to`.
    pub fn transition(
        from: WorkflowPhase,
        to: WorkflowPhase,
        phase_complete: bool,
        trigger: impl Into<String>,
    ) -> Self {
        let at = Utc::now();
        Self {
            phase: Some(to),
            previous_phase: Some(from),
            role: Some(to.canonical_role()),
            phase_complete: Some(phase_complete),
            last_transition_at: Some(at),
            transition: Some(TransitionRecord {
                from,
                to,
                at,
                trigger: trigger.into(),
            }),
            extra: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_state_starts_in_planning() {
        let state = WorkflowState::new("hello-api");
        assert_eq!(state.feature, "hello-api");
        assert_eq!(state.phase, WorkflowPhase::Planning);
        assert_eq!(state.role, Role::Orchestrator);
        assert!(state.previous_phase.is_none());
        assert!(!state.phase_complete);
    }

    #[test]
    fn test_apply_merges_only_supplied_fields() {
        let mut state = WorkflowState::new("f");
        let started = state.started_at;
        state.apply(&StatePatch::new().phase_complete(true));

        assert!(state.phase_complete);
        assert_eq!(state.phase, WorkflowPhase::Planning);
        assert_eq!(state.role, Role::Orchestrator);
        assert_eq!(state.started_at, started);
    }

    #[test]
    fn test_transition_patch_sets_canonical_role() {
        let patch = StatePatch::transition(
            WorkflowPhase::Testing,
            WorkflowPhase::Implementation,
            true,
            "red phase observed",
        );
        let mut state = WorkflowState::new("f");
        state.apply(&patch);

        assert_eq!(state.phase, WorkflowPhase::Implementation);
        assert_eq!(state.previous_phase, Some(WorkflowPhase::Testing));
        assert_eq!(state.role, Role::Implementer);
        assert!(state.phase_complete);
        assert!(state.last_transition_at.is_some());
        assert_eq!(state.transitions.len(), 1);
        assert_eq!(state.transitions[0].trigger, "red phase observed");
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{
            "feature": "f",
            "phase": "testing",
            "role": "tester",
            "started_at": "2026-01-01T00:00:00Z",
            "version": "v7",
            "workflow_type": "automated"
        }"#;
        let state: WorkflowState = serde_json::from_str(json).unwrap();
        assert_eq!(state.extra.get("version"), Some(&serde_json::json!("v7")));

        let out = serde_json::to_value(&state).unwrap();
        assert_eq!(out["workflow_type"], "automated");
        assert_eq!(out["phase"], "testing");
    }

    #[test]
    fn test_missing_role_defaults_to_orchestrator() {
        let json = r#"{"feature": "f", "phase": "testing", "started_at": "2026-01-01T00:00:00Z"}"#;
        let state: WorkflowState = serde_json::from_str(json).unwrap();
        assert_eq!(state.role, Role::Orchestrator);
    }

    #[test]
    fn test_naive_timestamps_read_as_local_time() {
        let json = r#"{
            "feature": "f",
            "phase": "implementation",
            "role": "implementer",
            "started_at": "2026-01-01T09:30:00.123456",
            "last_transition": "2026-01-01T10:00:00"
        }"#;
        let state: WorkflowState = serde_json::from_str(json).unwrap();

        let naive = "2026-01-01T09:30:00.123456".parse::<chrono::NaiveDateTime>().unwrap();
        let expected = chrono::Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(state.started_at, expected);
        assert_eq!(state.phase, WorkflowPhase::Implementation);
        assert!(state.last_transition_at.is_some());
    }

    #[test]
    fn test_garbage_timestamp_is_rejected() {
        let json = r#"{"feature": "f", "started_at": "yesterday-ish"}"#;
        assert!(serde_json::from_str::<WorkflowState>(json).is_err());
    }

    #[test]
    fn test_age() {
        let mut state = WorkflowState::new("f");
        state.started_at = Utc::now() - chrono::Duration::hours(30);
        assert!(state.age(Utc::now()) >= chrono::Duration::hours(30));
    }
}
