//! Workflow phases and worker roles.
//!
//! This module provides:
//! - `WorkflowPhase`, the fixed forward-only sequence
//!   planning → testing → implementation → verification → complete
//! - `Role`, the capability profile of whichever worker drives a phase
//! - The canonical phase ↔ role pairing

use serde::{Deserialize, Serialize};

/// A named stage of the TDD workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPhase {
    #[default]
    Planning,
    Testing,
    Implementation,
    Verification,
    Complete,
}

impl WorkflowPhase {
    /// Returns every phase in workflow order.
    pub fn all() -> &'static [WorkflowPhase] {
        &[
            WorkflowPhase::Planning,
            WorkflowPhase::Testing,
            WorkflowPhase::Implementation,
            WorkflowPhase::Verification,
            WorkflowPhase::Complete,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Planning => "planning",
            WorkflowPhase::Testing => "testing",
            WorkflowPhase::Implementation => "implementation",
            WorkflowPhase::Verification => "verification",
            WorkflowPhase::Complete => "complete",
        }
    }

    /// The phase that follows this one, or `None` for the terminal phase.
    pub fn next(&self) -> Option<WorkflowPhase> {
        match self {
            WorkflowPhase::Planning => Some(WorkflowPhase::Testing),
            WorkflowPhase::Testing => Some(WorkflowPhase::Implementation),
            WorkflowPhase::Implementation => Some(WorkflowPhase::Verification),
            WorkflowPhase::Verification => Some(WorkflowPhase::Complete),
            WorkflowPhase::Complete => None,
        }
    }

    /// True when `to` is the immediate successor of this phase.
    pub fn can_advance_to(&self, to: WorkflowPhase) -> bool {
        self.next() == Some(to)
    }

    /// The worker that canonically drives this phase.
    pub fn canonical_role(&self) -> Role {
        match self {
            WorkflowPhase::Testing => Role::Tester,
            WorkflowPhase::Implementation => Role::Implementer,
            WorkflowPhase::Verification => Role::Verifier,
            WorkflowPhase::Planning | WorkflowPhase::Complete => Role::Orchestrator,
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowPhase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" => Ok(WorkflowPhase::Planning),
            "testing" => Ok(WorkflowPhase::Testing),
            "implementation" => Ok(WorkflowPhase::Implementation),
            "verification" => Ok(WorkflowPhase::Verification),
            "complete" => Ok(WorkflowPhase::Complete),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: planning, testing, implementation, verification, complete",
                s
            ),
        }
    }
}

/// The capability profile assigned to the active worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full trust; drives planning and finalization
    #[default]
    Orchestrator,
    /// Writes failing tests; may not touch production sources
    Tester,
    /// Makes tests pass; may not rewrite tests
    Implementer,
    /// Read-only review
    Verifier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Orchestrator => "orchestrator",
            Role::Tester => "tester",
            Role::Implementer => "implementer",
            Role::Verifier => "verifier",
        }
    }

    /// The label a checkpoint written by this role is addressed to.
    pub fn recipient_label(&self) -> &'static str {
        match self {
            Role::Orchestrator => "working instances",
            _ => "orchestrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "orchestrator" => Ok(Role::Orchestrator),
            "tester" | "test" => Ok(Role::Tester),
            "implementer" | "impl" => Ok(Role::Implementer),
            "verifier" | "verify" => Ok(Role::Verifier),
            _ => anyhow::bail!(
                "Invalid role '{}'. Valid values: orchestrator, tester, implementer, verifier",
                s
            ),
        }
    }
}
