//! Append-only audit trail of workflow events.
//!
//! Events land one JSON object per line in
//! `<run dir>/logs/subagent_events.jsonl`, read later by tooling that builds
//! timing reports for a run.

mod logger;

pub use logger::EventLog;

use crate::phase::WorkflowPhase;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Name of the event written when a worker subagent stops.
pub const SUBAGENT_COMPLETE: &str = "subagent_complete";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubagentEvent {
    pub event: String,
    pub subagent: String,
    pub timestamp: DateTime<Local>,
    pub phase: Option<WorkflowPhase>,
}

impl SubagentEvent {
    pub fn completed(phase: Option<WorkflowPhase>, at: DateTime<Local>) -> Self {
        Self {
            event: SUBAGENT_COMPLETE.to_string(),
            subagent: subagent_for_phase(phase).to_string(),
            timestamp: at,
            phase,
        }
    }
}

/// The worker that owns `phase`; `subagent` when no worker does.
pub fn subagent_for_phase(phase: Option<WorkflowPhase>) -> &'static str {
    match phase {
        Some(WorkflowPhase::Testing) => "tester",
        Some(WorkflowPhase::Implementation) => "implementer",
        Some(WorkflowPhase::Verification) => "verifier",
        _ => "subagent",
    }
}
