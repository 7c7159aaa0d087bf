//! Inbound trigger boundary.
//!
//! The host invokes `phasegate hook <event>` once per lifecycle event, with
//! one JSON object on stdin, and reads one JSON object back from stdout:
//!
//! ```json
//! {"continue": false, "hookSpecificOutput": {"decision": "deny", "reason": "...", "role": "tester", "tool": "Write"}}
//! ```
//!
//! # Hook Events
//!
//! - `pre-tool-use` - Role Authorization Gate on the attempted tool call
//! - `post-tool-use` - Phase Transition Detector on the executed tool's output
//! - `session-start` - activates a session for the configured feature
//! - `subagent-stop` - appends a `subagent_complete` event to the audit trail
//!
//! With no State Record on disk every event answers `{"continue": true}`.
//!
//! # Usage
//!
//! ```ignore
//! use phasegate::hooks::{HookEvent, HookRunner};
//!
//! let runner = HookRunner::new(session, config);
//! let response = runner.run(HookEvent::PreToolUse, &stdin).await;
//! println!("{}", response.to_json());
//! ```

mod runner;
mod types;

pub use runner::HookRunner;
pub use types::{HookEvent, HookInput, HookResponse};
