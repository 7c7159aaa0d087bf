//! Checkpoint channel: the one-way messages between workflow phases.
//!
//! This module provides:
//! - `Checkpoint`, the immutable self-describing record
//! - `CheckpointStore`, an append-only named-record store with a filesystem
//!   backing (`FsCheckpointStore`) and an in-memory one (`MemoryCheckpointStore`)
//! - `CheckpointMonitor`, the producer/consumer facade with backoff polling
//! - `Clock`, so polling can run against a fake clock in tests
//!
//! # Record format
//!
//! ~~~text
//! # Checkpoint: 003-tests-complete.md
//!
//! **From:** tester
//! **To:** orchestrator
//! **Timestamp:** 2026-10-18 14:03:11
//! **Feature:** hello-api
//!
//! ## Content
//!
//! 10 tests written, all failing.
//!
//! ## Metadata
//!
//! ```json
//! { "tests": 10 }
//! ```
//! ~~~

mod clock;
mod monitor;
mod store;

pub use clock::{Clock, SystemClock};
pub use monitor::{Backoff, CheckpointMonitor, RunInfo};
pub use store::{CheckpointStore, FsCheckpointStore, MemoryCheckpointStore, PutOutcome};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// An immutable record marking completion of a unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Local>,
    pub feature: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Checkpoint {
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        feature: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            timestamp: Local::now(),
            feature: feature.into(),
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Render the header, content and optional metadata block.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# Checkpoint: {}\n\n**From:** {}\n**To:** {}\n**Timestamp:** {}\n**Feature:** {}\n\n## Content\n\n{}\n",
            self.name,
            self.from,
            self.to,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.feature,
            self.content
        );

        if let Some(ref metadata) = self.metadata {
            let json = serde_json::to_string_pretty(metadata).unwrap_or_else(|_| metadata.to_string());
            out.push_str("\n## Metadata\n\n```json\n");
            out.push_str(&json);
            out.push_str("\n```\n");
        }

        out
    }
}

/// Name for a detector-written phase completion record:
/// `<YYYYmmdd_HHMMSS>_<phase>_complete.md`.
pub fn phase_complete_name(phase: &str, at: DateTime<Local>) -> String {
    format!("{}_{}_complete.md", at.format("%Y%m%d_%H%M%S"), phase)
}

/// A checkpoint name must be a single plain file name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
